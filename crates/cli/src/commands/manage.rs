//! Profile list management: create, rename, duplicate, delete, reorder, select

use anyhow::Result;
use dialoguer::Confirm;
use tracing::info;

use crate::commands::{Completion, Context, MoveDirection};
use crate::error::CliError;
use crate::output;

pub async fn list(ctx: &Context) -> Result<Completion> {
    let collection = ctx.load().await?;
    output::print_profile_list(&collection, ctx.json);
    Ok(Completion::Done)
}

pub async fn create(ctx: &Context, name: &str) -> Result<Completion> {
    let mut collection = ctx.load().await?;
    let id = collection.create(name);
    ctx.save(&collection).await?;

    let name = collection.find(id).map(|p| p.name().to_string()).unwrap_or_default();
    info!(%id, %name, "Profile created");
    output::print_success(&format!("Created profile {} ({})", name, id), ctx.json);
    Ok(Completion::Done)
}

pub async fn rename(ctx: &Context, reference: &str, name: &str) -> Result<Completion> {
    let mut collection = ctx.load().await?;
    let id = collection.resolve(reference).map_err(CliError::from)?.id();
    let old = collection.find(id).map(|p| p.name().to_string()).unwrap_or_default();
    let new = collection.rename(id, name).map_err(CliError::from)?.to_string();
    ctx.save(&collection).await?;

    output::print_success(&format!("Renamed {} to {}", old, new), ctx.json);
    Ok(Completion::Done)
}

pub async fn duplicate(ctx: &Context, reference: &str) -> Result<Completion> {
    let mut collection = ctx.load().await?;
    let source = collection.resolve(reference).map_err(CliError::from)?.id();
    let copy = collection.duplicate(source).map_err(CliError::from)?;
    ctx.save(&collection).await?;

    output::print_success(&format!("Duplicated profile as {}", copy), ctx.json);
    Ok(Completion::Done)
}

pub async fn delete(ctx: &Context, reference: &str, yes: bool) -> Result<Completion> {
    let mut collection = ctx.load().await?;
    let profile = collection.resolve(reference).map_err(CliError::from)?;
    let (id, name) = (profile.id(), profile.name().to_string());

    if collection.len() <= 1 {
        return Err(CliError::LastProfile.into());
    }

    if !yes
        && !ctx.json
        && !Confirm::new()
            .with_prompt(format!("Delete profile {}?", name))
            .default(false)
            .interact()?
    {
        output::print_warning("Delete cancelled", ctx.json);
        return Ok(Completion::Done);
    }

    collection.delete(id).map_err(CliError::from)?;
    ctx.save(&collection).await?;

    output::print_success(&format!("Deleted profile {}", name), ctx.json);
    Ok(Completion::Done)
}

pub async fn move_profile(
    ctx: &Context,
    reference: &str,
    direction: MoveDirection,
) -> Result<Completion> {
    let mut collection = ctx.load().await?;
    let id = collection.resolve(reference).map_err(CliError::from)?.id();
    let position = match direction {
        MoveDirection::Up => collection.move_up(id),
        MoveDirection::Down => collection.move_down(id),
    }
    .map_err(CliError::from)?;
    ctx.save(&collection).await?;

    output::print_success(&format!("Profile is now at position {}", position + 1), ctx.json);
    Ok(Completion::Done)
}

pub async fn select(ctx: &Context, reference: &str) -> Result<Completion> {
    let mut collection = ctx.load().await?;
    let profile = collection.resolve(reference).map_err(CliError::from)?;
    let (id, name) = (profile.id(), profile.name().to_string());
    collection.set_current(id).map_err(CliError::from)?;
    ctx.save(&collection).await?;

    output::print_success(&format!("Selected profile {}", name), ctx.json);
    Ok(Completion::Done)
}
