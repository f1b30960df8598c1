//! Guard and execution steps of the drag pipeline.
//!
//! Steps are transition functions: each inspects the task and answers
//! with a [`StepFlow`] effect. Rendering dialogs, parking the operation
//! and bookkeeping all stay in the driver, which keeps every step
//! testable against a repository and nothing else.

use strum::Display;
use tracing::info;

use grove_tree::error::TreeError;
use grove_tree::id::{templates, NodeId};
use grove_tree::order::place;
use grove_tree::repo::Repository;

use crate::error::ShellError;
use crate::host::{AccessPolicy, JobScheduler, LinkIndex};
use crate::naming::copy_name;
use crate::pipeline::PipelineConfig;
use crate::request::{DragMode, DragOutcome, DragRequest, DropPosition};

/// Pipeline steps, in execution order.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[strum(serialize_all = "kebab-case")]
pub enum StepId {
    /// Destination and source access checks.
    CheckPermissions,
    /// Warn before copying a language definition.
    CheckLanguage,
    /// Warn before moving a heavily-linked item.
    CheckLinks,
    /// Cross-store guard and shadowed-source warning.
    CheckShadows,
    /// The caller-requested confirmation dialog.
    Confirm,
    /// The move or copy itself, plus the sort-order fix.
    Execute,
    /// Queue the link-repair job after a move.
    RepairLinks,
}

pub(crate) const STEPS: [StepId; 7] = [
    StepId::CheckPermissions,
    StepId::CheckLanguage,
    StepId::CheckLinks,
    StepId::CheckShadows,
    StepId::Confirm,
    StepId::Execute,
    StepId::RepairLinks,
];

/// Effect a step hands back to the driver.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum StepFlow {
    /// Nothing to do here; run the next step.
    Continue,
    /// Refuse the operation with an alert.
    Reject(String),
    /// Park the operation and put this question to the user.
    AskUser(String),
}

/// Resolved context a drag operation carries between steps.
#[derive(Clone, Debug)]
pub(crate) struct DragTask {
    pub request: DragRequest,
    /// Parent the node will end up under.
    pub dest: NodeId,
    /// Filled in by [`execute`].
    pub outcome: Option<DragOutcome>,
}

/// Resolves the destination parent: the target itself for `Into` drops,
/// the target's parent otherwise.
pub(crate) fn resolve_destination<R>(
    repo: &R,
    request: &DragRequest,
) -> Result<NodeId, ShellError>
where
    R: Repository + ?Sized,
{
    let target = repo.node(request.target)?;
    match request.position {
        DropPosition::Into => Ok(target.id),
        DropPosition::Before | DropPosition::After => Ok(target
            .parent
            .ok_or(TreeError::NotFound(target.id))?),
    }
}

pub(crate) fn check_permissions<R, A>(
    repo: &R,
    access: &A,
    task: &DragTask,
) -> Result<StepFlow, ShellError>
where
    R: Repository + ?Sized,
    A: AccessPolicy + ?Sized,
{
    let source = repo.node(task.request.source)?;
    let dest = task.dest;

    if source.id == dest {
        return Ok(StepFlow::Reject(
            "You cannot drag an item onto itself.".to_owned(),
        ));
    }
    if repo.is_ancestor(source.id, dest)? {
        return Ok(StepFlow::Reject(
            "You cannot drag an item to a subitem.".to_owned(),
        ));
    }
    if !task.request.mode.is_copy() && source.protected {
        return Ok(StepFlow::Reject(
            "You cannot move a protected item.".to_owned(),
        ));
    }
    if !access.can_create(dest) {
        return Ok(StepFlow::Reject(
            "You do not have permission to create items here.".to_owned(),
        ));
    }
    if task.request.mode.is_copy() {
        if !access.can_copy_to(source.id, dest) {
            return Ok(StepFlow::Reject(
                "You do not have permission to copy the item to the new location."
                    .to_owned(),
            ));
        }
    } else if !access.can_move_to(source.id, dest) {
        return Ok(StepFlow::Reject(
            "You do not have permission to move the item to the new location".to_owned(),
        ));
    }

    Ok(StepFlow::Continue)
}

pub(crate) fn check_language<R>(repo: &R, task: &DragTask) -> Result<StepFlow, ShellError>
where
    R: Repository + ?Sized,
{
    if !task.request.mode.is_copy() {
        return Ok(StepFlow::Continue);
    }

    let source = repo.node(task.request.source)?;
    if source.template == templates::LANGUAGE {
        return Ok(StepFlow::AskUser(
            "You are copying a language.\n\n\
             A language item must have a name that is a valid ISO-code.\n\n\
             Please rename the copied item afterward.\n\n\
             Are you sure you want to continue?"
                .to_owned(),
        ));
    }

    Ok(StepFlow::Continue)
}

pub(crate) fn check_links<L>(
    links: &L,
    config: &PipelineConfig,
    task: &DragTask,
) -> Result<StepFlow, ShellError>
where
    L: LinkIndex + ?Sized,
{
    if task.request.mode.is_copy() {
        return Ok(StepFlow::Continue);
    }

    if links.referrer_count(task.request.source)? > config.link_warning_threshold {
        return Ok(StepFlow::AskUser(
            "This operation may take a long time to complete.\n\n\
             Are you sure you want to continue?"
                .to_owned(),
        ));
    }

    Ok(StepFlow::Continue)
}

pub(crate) fn check_shadows<R>(repo: &R, task: &DragTask) -> Result<StepFlow, ShellError>
where
    R: Repository + ?Sized,
{
    let source = repo.node(task.request.source)?;
    let dest = repo.node(task.dest)?;

    if source.origin != dest.origin {
        return Ok(StepFlow::Reject(
            "The item is from another database, and you cannot move\n\
             an item outside its database."
                .to_owned(),
        ));
    }

    if source.is_virtual || repo.has_shadows(source.id)? {
        return Ok(StepFlow::AskUser(format!(
            "This item also occurs in other locations. If you {verb} it,\n\
             it may be deleted from the other locations.\n\n\
             Are you sure you want to {verb} '{name}'?",
            verb = task.request.mode.verb(),
            name = source.name,
        )));
    }

    Ok(StepFlow::Continue)
}

pub(crate) fn confirm<R>(repo: &R, task: &DragTask) -> Result<StepFlow, ShellError>
where
    R: Repository + ?Sized,
{
    if !task.request.confirm {
        return Ok(StepFlow::Continue);
    }

    let source = repo.node(task.request.source)?;
    let detail = match task.request.position {
        DropPosition::After => {
            let anchor = repo.node(task.request.target)?;
            format!("'{}' after '{}'", source.label(), anchor.label())
        }
        DropPosition::Before => {
            let anchor = repo.node(task.request.target)?;
            format!("'{}' before '{}'", source.label(), anchor.label())
        }
        DropPosition::Into => {
            let parent = repo.node(task.dest)?;
            format!("'{}' to '{}'", source.label(), parent.label())
        }
    };

    Ok(StepFlow::AskUser(format!(
        "Are you sure you want to {} {}?",
        task.request.mode.verb(),
        detail,
    )))
}

pub(crate) fn execute<R>(repo: &R, task: &mut DragTask) -> Result<StepFlow, ShellError>
where
    R: Repository + ?Sized,
{
    let source = repo.node(task.request.source)?;
    let dest = task.dest;

    let node = match task.request.mode {
        DragMode::Copy => {
            let names: Vec<String> = repo
                .children(dest)?
                .into_iter()
                .map(|sibling| sibling.name)
                .collect();
            let name = copy_name(names.iter().map(String::as_str), &source.name);
            info!(source = %source.id, destination = %dest, %name, "copy item");
            repo.copy_node(source.id, dest, &name)?
        }
        DragMode::Move => {
            info!(source = %source.id, destination = %dest, "drag item");
            repo.move_node(source.id, dest)?;
            source.id
        }
    };

    let sort_key = match task.request.position.direction() {
        Some(direction) => Some(place(repo, node, task.request.target, direction)?),
        None => None,
    };

    task.outcome = Some(DragOutcome {
        node,
        parent: dest,
        sort_key,
        mode: task.request.mode,
    });

    Ok(StepFlow::Continue)
}

pub(crate) fn repair_links<J>(jobs: &J, task: &DragTask) -> Result<StepFlow, ShellError>
where
    J: JobScheduler + ?Sized,
{
    if task.request.mode.is_copy() {
        return Ok(StepFlow::Continue);
    }

    jobs.schedule_link_repair(task.request.source)?;
    Ok(StepFlow::Continue)
}
