//! Drag pipeline driver.
//!
//! The driver runs the guard steps in order, renders their effects
//! through [`Frontend`], and parks the operation whenever a step puts a
//! question to the user. A parked operation resumes on the postback that
//! carries the answer, continuing with the step after the one that asked.
//! Steps run on the caller's thread; only link repair leaves it.

use std::sync::Arc;

use dashmap::DashMap;
use grove_tree::error::TreeError;
use grove_tree::repo::Repository;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::ShellError;
use crate::host::{AccessPolicy, Frontend, JobScheduler, LinkIndex};
use crate::request::{DragOutcome, DragRequest};
use crate::state::{Answer, ConfirmState, OperationId, PendingDrag};
use crate::steps::{self, DragTask, StepFlow, StepId, STEPS};

/// Referrer count above which moving an item warns that the operation may
/// take a while.
pub const MANY_LINKS_THRESHOLD: usize = 250;

/// Tunables for the drag pipeline.
#[derive(Clone, Copy, Debug)]
pub struct PipelineConfig {
    /// Moves of items with more referrers than this ask the user first.
    pub link_warning_threshold: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            link_warning_threshold: MANY_LINKS_THRESHOLD,
        }
    }
}

/// The driver's answer to one client round-trip.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DragStatus {
    /// The operation ran to completion.
    Completed(DragOutcome),
    /// A dialog is on the client. Echo `operation` back through
    /// [`DragPipeline::resume`] with the user's answer.
    AwaitingConfirmation {
        /// Correlation id of the parked operation.
        operation: OperationId,
        /// Question shown to the user.
        prompt: String,
    },
    /// A guard refused the operation, or the user declined. `reason`
    /// carries the alert message for guard rejections and is absent for
    /// declines and the editor gate.
    Aborted {
        /// Alert message, when a guard rejected.
        reason: Option<String>,
    },
}

/// Drag-item-to pipeline over a repository and its host collaborators.
pub struct DragPipeline<R, A, L, F, J>
where
    R: ?Sized,
    A: ?Sized,
    L: ?Sized,
    F: ?Sized,
    J: ?Sized,
{
    repo: Arc<R>,
    access: Arc<A>,
    links: Arc<L>,
    frontend: Arc<F>,
    jobs: Arc<J>,
    config: PipelineConfig,
    pending: DashMap<OperationId, PendingDrag>,
}

impl<R, A, L, F, J> DragPipeline<R, A, L, F, J>
where
    R: Repository + ?Sized,
    A: AccessPolicy + ?Sized,
    L: LinkIndex + ?Sized,
    F: Frontend + ?Sized,
    J: JobScheduler + ?Sized,
{
    /// Builds a pipeline with the default [`PipelineConfig`].
    pub fn new(
        repo: Arc<R>,
        access: Arc<A>,
        links: Arc<L>,
        frontend: Arc<F>,
        jobs: Arc<J>,
    ) -> Self {
        Self {
            repo,
            access,
            links,
            frontend,
            jobs,
            config: PipelineConfig::default(),
            pending: DashMap::new(),
        }
    }

    /// Replaces the pipeline tunables.
    #[must_use]
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Number of operations currently parked on a dialog.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Runs a drag until it completes, parks on a dialog, or aborts.
    ///
    /// # Errors
    ///
    /// [`ShellError::Tree`] when the request names missing nodes or the
    /// repository fails mid-operation, and collaborator failures as
    /// [`ShellError::Links`] or [`ShellError::Jobs`].
    pub fn start(&self, request: DragRequest) -> Result<DragStatus, ShellError> {
        self.begin(request, None)
    }

    /// [`Self::start`], plus a channel that resolves with the terminal
    /// [`DragStatus`] once the operation completes or aborts, however many
    /// postbacks that takes. The channel closes without a value when the
    /// operation dies with an error instead.
    ///
    /// # Errors
    ///
    /// As for [`Self::start`].
    pub fn start_watched(
        &self,
        request: DragRequest,
    ) -> (Result<DragStatus, ShellError>, oneshot::Receiver<DragStatus>) {
        let (done, watch) = oneshot::channel();
        (self.begin(request, Some(done)), watch)
    }

    /// Feeds a dialog answer back into a parked operation.
    ///
    /// # Errors
    ///
    /// [`ShellError::UnknownOperation`] for an id the pipeline is not
    /// tracking, [`ShellError::NotAwaiting`] when no dialog is
    /// outstanding, and the [`Self::start`] errors when the resumed steps
    /// fail.
    pub fn resume(
        &self,
        operation: OperationId,
        answer: Answer,
    ) -> Result<DragStatus, ShellError> {
        let (_, parked) = self
            .pending
            .remove(&operation)
            .ok_or(ShellError::UnknownOperation(operation))?;
        let PendingDrag {
            task,
            cursor,
            state,
            done,
        } = parked;

        let Some(next) = state.answered(answer) else {
            return Err(ShellError::NotAwaiting(operation));
        };

        if let ConfirmState::Confirmed { step } = next {
            debug!(%operation, %step, "confirmation accepted");
            self.advance(task, cursor + 1, done)
        } else {
            debug!(%operation, "confirmation declined");
            Ok(Self::finish(DragStatus::Aborted { reason: None }, done))
        }
    }

    fn begin(
        &self,
        request: DragRequest,
        done: Option<oneshot::Sender<DragStatus>>,
    ) -> Result<DragStatus, ShellError> {
        if !self.frontend.check_modified() {
            debug!(source = %request.source, "client editor state blocks the drag");
            return Ok(Self::finish(DragStatus::Aborted { reason: None }, done));
        }

        let dest = steps::resolve_destination(self.repo.as_ref(), &request)?;
        let task = DragTask {
            request,
            dest,
            outcome: None,
        };
        self.advance(task, 0, done)
    }

    fn advance(
        &self,
        mut task: DragTask,
        from: usize,
        done: Option<oneshot::Sender<DragStatus>>,
    ) -> Result<DragStatus, ShellError> {
        for (cursor, step) in STEPS.iter().enumerate().skip(from) {
            match self.run_step(*step, &mut task)? {
                StepFlow::Continue => {}
                StepFlow::Reject(message) => {
                    warn!(%step, source = %task.request.source, "drag rejected");
                    self.frontend.alert(&message);
                    return Ok(Self::finish(
                        DragStatus::Aborted {
                            reason: Some(message),
                        },
                        done,
                    ));
                }
                StepFlow::AskUser(prompt) => {
                    let operation = OperationId::random();
                    debug!(%operation, %step, "parking drag for confirmation");
                    self.frontend.confirm(&prompt);
                    let _previous = self.pending.insert(
                        operation,
                        PendingDrag {
                            task,
                            cursor,
                            state: ConfirmState::ask(*step, prompt.clone()),
                            done,
                        },
                    );
                    return Ok(DragStatus::AwaitingConfirmation { operation, prompt });
                }
            }
        }

        match task.outcome {
            Some(outcome) => {
                debug!(node = %outcome.node, parent = %outcome.parent, "drag completed");
                Ok(Self::finish(DragStatus::Completed(outcome), done))
            }
            // Execute fills the outcome before the step list ends.
            None => Err(ShellError::Tree(TreeError::Backend(
                "drag finished without executing".to_owned(),
            ))),
        }
    }

    fn run_step(&self, step: StepId, task: &mut DragTask) -> Result<StepFlow, ShellError> {
        match step {
            StepId::CheckPermissions => {
                steps::check_permissions(self.repo.as_ref(), self.access.as_ref(), task)
            }
            StepId::CheckLanguage => steps::check_language(self.repo.as_ref(), task),
            StepId::CheckLinks => {
                steps::check_links(self.links.as_ref(), &self.config, task)
            }
            StepId::CheckShadows => steps::check_shadows(self.repo.as_ref(), task),
            StepId::Confirm => steps::confirm(self.repo.as_ref(), task),
            StepId::Execute => steps::execute(self.repo.as_ref(), task),
            StepId::RepairLinks => steps::repair_links(self.jobs.as_ref(), task),
        }
    }

    fn finish(status: DragStatus, done: Option<oneshot::Sender<DragStatus>>) -> DragStatus {
        if let Some(done) = done {
            // The watcher may be gone already; the operation does not care.
            let _ignored = done.send(status.clone());
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use claims::{assert_err, assert_ok};
    use grove_tree::id::{templates, NodeId};
    use grove_tree::mem::{MemoryRepository, NodeSpec};

    use super::*;
    use crate::host::PermitAll;
    use crate::request::{DragMode, DropPosition};

    // ===== Test doubles =====

    #[derive(Default)]
    struct RecordingFrontend {
        alerts: Mutex<Vec<String>>,
        confirms: Mutex<Vec<String>>,
        blocked: bool,
    }

    impl RecordingFrontend {
        fn blocked() -> Self {
            Self {
                blocked: true,
                ..Self::default()
            }
        }

        fn alerts(&self) -> Vec<String> {
            self.alerts.lock().unwrap().clone()
        }

        fn confirms(&self) -> Vec<String> {
            self.confirms.lock().unwrap().clone()
        }
    }

    impl Frontend for RecordingFrontend {
        fn alert(&self, message: &str) {
            self.alerts.lock().unwrap().push(message.to_owned());
        }

        fn confirm(&self, message: &str) {
            self.confirms.lock().unwrap().push(message.to_owned());
        }

        fn check_modified(&self) -> bool {
            !self.blocked
        }
    }

    #[derive(Default)]
    struct RecordingJobs {
        scheduled: Mutex<Vec<NodeId>>,
    }

    impl RecordingJobs {
        fn scheduled(&self) -> Vec<NodeId> {
            self.scheduled.lock().unwrap().clone()
        }
    }

    impl JobScheduler for RecordingJobs {
        fn schedule_link_repair(&self, root: NodeId) -> Result<(), ShellError> {
            self.scheduled.lock().unwrap().push(root);
            Ok(())
        }
    }

    #[derive(Default)]
    struct StaticLinks {
        referrers: usize,
    }

    #[async_trait]
    impl LinkIndex for StaticLinks {
        fn referrer_count(&self, _id: NodeId) -> Result<usize, ShellError> {
            Ok(self.referrers)
        }

        async fn repair(&self, _root: NodeId) -> Result<(), ShellError> {
            Ok(())
        }
    }

    struct Toggles {
        create: bool,
        move_to: bool,
        copy_to: bool,
    }

    impl Default for Toggles {
        fn default() -> Self {
            Self {
                create: true,
                move_to: true,
                copy_to: true,
            }
        }
    }

    impl AccessPolicy for Toggles {
        fn can_create(&self, _parent: NodeId) -> bool {
            self.create
        }

        fn can_move_to(&self, _source: NodeId, _target: NodeId) -> bool {
            self.move_to
        }

        fn can_copy_to(&self, _source: NodeId, _target: NodeId) -> bool {
            self.copy_to
        }
    }

    // ===== Fixture =====

    type TestPipeline =
        DragPipeline<MemoryRepository, Toggles, StaticLinks, RecordingFrontend, RecordingJobs>;

    struct Fixture {
        repo: Arc<MemoryRepository>,
        frontend: Arc<RecordingFrontend>,
        jobs: Arc<RecordingJobs>,
        pipeline: TestPipeline,
        root: NodeId,
        a: NodeId,
        b: NodeId,
        c: NodeId,
        source_parent: NodeId,
        source: NodeId,
    }

    /// Tree under test:
    ///
    /// ```text
    /// root        elsewhere
    /// ├─ a (0)    └─ page (700)   <- the dragged node
    /// ├─ b (100)
    /// └─ c (200)
    /// ```
    fn fixture() -> Fixture {
        fixture_with(
            Toggles::default(),
            StaticLinks::default(),
            RecordingFrontend::default(),
        )
    }

    fn fixture_with(
        access: Toggles,
        links: StaticLinks,
        frontend: RecordingFrontend,
    ) -> Fixture {
        let repo = Arc::new(MemoryRepository::new("master"));
        let root = repo.add_node(None, NodeSpec::named("root")).unwrap();
        let a = repo
            .add_node(Some(root), NodeSpec::named("a").with_sort_key(0))
            .unwrap();
        let b = repo
            .add_node(Some(root), NodeSpec::named("b").with_sort_key(100))
            .unwrap();
        let c = repo
            .add_node(Some(root), NodeSpec::named("c").with_sort_key(200))
            .unwrap();
        let source_parent = repo.add_node(None, NodeSpec::named("elsewhere")).unwrap();
        let source = repo
            .add_node(
                Some(source_parent),
                NodeSpec::named("page").with_sort_key(700),
            )
            .unwrap();

        let frontend = Arc::new(frontend);
        let jobs = Arc::new(RecordingJobs::default());
        let pipeline = DragPipeline::new(
            Arc::clone(&repo),
            Arc::new(access),
            Arc::new(links),
            Arc::clone(&frontend),
            Arc::clone(&jobs),
        );

        Fixture {
            repo,
            frontend,
            jobs,
            pipeline,
            root,
            a,
            b,
            c,
            source_parent,
            source,
        }
    }

    fn request(
        fx: &Fixture,
        target: NodeId,
        position: DropPosition,
        mode: DragMode,
    ) -> DragRequest {
        DragRequest {
            source: fx.source,
            target,
            position,
            mode,
            confirm: false,
        }
    }

    fn completed(status: DragStatus) -> DragOutcome {
        match status {
            DragStatus::Completed(outcome) => outcome,
            other => panic!("expected completion, got {other:?}"),
        }
    }

    fn awaiting(status: DragStatus) -> (OperationId, String) {
        match status {
            DragStatus::AwaitingConfirmation { operation, prompt } => (operation, prompt),
            other => panic!("expected a dialog, got {other:?}"),
        }
    }

    fn aborted(status: DragStatus) -> Option<String> {
        match status {
            DragStatus::Aborted { reason } => reason,
            other => panic!("expected an abort, got {other:?}"),
        }
    }

    fn child_order(repo: &MemoryRepository, parent: NodeId) -> Vec<NodeId> {
        repo.children(parent)
            .unwrap()
            .into_iter()
            .map(|node| node.id)
            .collect()
    }

    // ===== Moves =====

    #[test]
    fn move_after_sibling__relocates_and_balances() {
        let fx = fixture();

        let status = assert_ok!(fx
            .pipeline
            .start(request(&fx, fx.a, DropPosition::After, DragMode::Move)));
        let outcome = completed(status);

        assert_eq!(outcome.node, fx.source);
        assert_eq!(outcome.parent, fx.root);
        assert_eq!(outcome.sort_key, Some(50));
        assert_eq!(outcome.mode, DragMode::Move);

        assert_eq!(fx.repo.parent_of(fx.source).unwrap(), Some(fx.root));
        assert_eq!(
            child_order(&fx.repo, fx.root),
            vec![fx.a, fx.source, fx.b, fx.c],
        );
        assert_eq!(fx.jobs.scheduled(), vec![fx.source]);
        assert!(fx.frontend.alerts().is_empty());
        assert!(fx.frontend.confirms().is_empty());
    }

    #[test]
    fn move_before_sibling__relocates_and_balances() {
        let fx = fixture();

        let status = assert_ok!(fx
            .pipeline
            .start(request(&fx, fx.b, DropPosition::Before, DragMode::Move)));

        assert_eq!(completed(status).sort_key, Some(50));
        assert_eq!(
            child_order(&fx.repo, fx.root),
            vec![fx.a, fx.source, fx.b, fx.c],
        );
    }

    #[test]
    fn move_into_parent__appends_without_reordering() {
        let fx = fixture();

        let status = assert_ok!(fx
            .pipeline
            .start(request(&fx, fx.root, DropPosition::Into, DragMode::Move)));
        let outcome = completed(status);

        assert_eq!(outcome.sort_key, None);
        assert_eq!(fx.repo.parent_of(fx.source).unwrap(), Some(fx.root));
        // Untouched keys: the dragged node sorts by its old key.
        assert_eq!(
            child_order(&fx.repo, fx.root),
            vec![fx.a, fx.b, fx.c, fx.source],
        );
    }

    // ===== Copies =====

    #[test]
    fn copy_into_parent__copies_and_skips_link_repair() {
        let fx = fixture();

        let status = assert_ok!(fx
            .pipeline
            .start(request(&fx, fx.root, DropPosition::Into, DragMode::Copy)));
        let outcome = completed(status);

        assert_ne!(outcome.node, fx.source);
        assert_eq!(fx.repo.node(outcome.node).unwrap().name, "page");
        // The source stays put and no link repair is queued.
        assert_eq!(fx.repo.parent_of(fx.source).unwrap(), Some(fx.source_parent));
        assert!(fx.jobs.scheduled().is_empty());
    }

    #[test]
    fn copy_after_sibling__balances_the_copy_only() {
        let fx = fixture();

        let status = assert_ok!(fx
            .pipeline
            .start(request(&fx, fx.a, DropPosition::After, DragMode::Copy)));
        let outcome = completed(status);

        assert_eq!(outcome.sort_key, Some(50));
        assert_eq!(fx.repo.node(outcome.node).unwrap().sort_key, 50);
        assert_eq!(fx.repo.node(fx.source).unwrap().sort_key, 700);
    }

    #[test]
    fn copy__takes_a_free_name_on_collision() {
        let fx = fixture();
        let _clash = fx
            .repo
            .add_node(Some(fx.root), NodeSpec::named("page").with_sort_key(300))
            .unwrap();

        let status = assert_ok!(fx
            .pipeline
            .start(request(&fx, fx.root, DropPosition::Into, DragMode::Copy)));

        let copy = completed(status).node;
        assert_eq!(fx.repo.node(copy).unwrap().name, "Copy of page");
    }

    // ===== Confirmation round-trips =====

    #[test]
    fn confirm__parks_then_executes_on_yes() {
        let fx = fixture();
        let mut req = request(&fx, fx.a, DropPosition::After, DragMode::Move);
        req.confirm = true;

        let (operation, prompt) = awaiting(assert_ok!(fx.pipeline.start(req)));
        assert_eq!(prompt, "Are you sure you want to move 'page' after 'a'?");
        assert_eq!(fx.pipeline.pending_count(), 1);
        assert_eq!(fx.frontend.confirms(), vec![prompt]);
        // Parked, not executed.
        assert_eq!(
            fx.repo.parent_of(fx.source).unwrap(),
            Some(fx.source_parent),
        );

        let status = assert_ok!(fx.pipeline.resume(operation, Answer::Yes));
        assert_eq!(completed(status).sort_key, Some(50));
        assert_eq!(fx.pipeline.pending_count(), 0);
        assert_eq!(fx.repo.parent_of(fx.source).unwrap(), Some(fx.root));
    }

    #[test]
    fn confirm__no_aborts_without_executing() {
        let fx = fixture();
        let mut req = request(&fx, fx.a, DropPosition::After, DragMode::Move);
        req.confirm = true;

        let (operation, _) = awaiting(assert_ok!(fx.pipeline.start(req)));
        let status = assert_ok!(fx.pipeline.resume(operation, Answer::No));

        assert_eq!(aborted(status), None);
        assert_eq!(fx.pipeline.pending_count(), 0);
        assert_eq!(
            fx.repo.parent_of(fx.source).unwrap(),
            Some(fx.source_parent),
        );
        assert!(fx.jobs.scheduled().is_empty());
    }

    #[test]
    fn confirm__into_prompt_names_the_destination() {
        let fx = fixture();
        let mut req = request(&fx, fx.root, DropPosition::Into, DragMode::Copy);
        req.confirm = true;

        let (_, prompt) = awaiting(assert_ok!(fx.pipeline.start(req)));
        assert_eq!(prompt, "Are you sure you want to copy 'page' to 'root'?");
    }

    #[test]
    fn resume__unknown_operation_is_an_error() {
        let fx = fixture();

        let err = assert_err!(fx.pipeline.resume(OperationId::random(), Answer::Yes));
        assert!(matches!(err, ShellError::UnknownOperation(_)));
    }

    #[test]
    fn confirm__dialogs_chain_across_steps() {
        let fx = fixture();
        let language = fx
            .repo
            .add_node(
                Some(fx.source_parent),
                NodeSpec::named("da").with_template(templates::LANGUAGE),
            )
            .unwrap();
        let req = DragRequest {
            source: language,
            target: fx.root,
            position: DropPosition::Into,
            mode: DragMode::Copy,
            confirm: true,
        };

        let (first, prompt) = awaiting(assert_ok!(fx.pipeline.start(req)));
        assert!(prompt.contains("ISO-code"));

        let (second, prompt) = awaiting(assert_ok!(fx.pipeline.resume(first, Answer::Yes)));
        assert_eq!(prompt, "Are you sure you want to copy 'da' to 'root'?");

        let status = assert_ok!(fx.pipeline.resume(second, Answer::Yes));
        let copy = completed(status).node;
        assert_eq!(fx.repo.parent_of(copy).unwrap(), Some(fx.root));
    }

    #[test]
    fn pending__parked_operations_are_independent() {
        let fx = fixture();
        let mut first = request(&fx, fx.a, DropPosition::After, DragMode::Move);
        first.confirm = true;
        let mut second = request(&fx, fx.b, DropPosition::After, DragMode::Move);
        second.confirm = true;

        let (first, _) = awaiting(assert_ok!(fx.pipeline.start(first)));
        let (second, _) = awaiting(assert_ok!(fx.pipeline.start(second)));
        assert_ne!(first, second);
        assert_eq!(fx.pipeline.pending_count(), 2);

        assert_eq!(aborted(assert_ok!(fx.pipeline.resume(first, Answer::No))), None);
        let outcome = completed(assert_ok!(fx.pipeline.resume(second, Answer::Yes)));
        assert_eq!(outcome.node, fx.source);
        assert_eq!(fx.pipeline.pending_count(), 0);
    }

    // ===== Guards =====

    #[test]
    fn guard__language_copy_warns_first() {
        let fx = fixture();
        let language = fx
            .repo
            .add_node(
                Some(fx.source_parent),
                NodeSpec::named("no").with_template(templates::LANGUAGE),
            )
            .unwrap();
        let req = DragRequest {
            source: language,
            target: fx.root,
            position: DropPosition::Into,
            mode: DragMode::Copy,
            confirm: false,
        };

        let (operation, prompt) = awaiting(assert_ok!(fx.pipeline.start(req.clone())));
        assert!(prompt.contains("valid ISO-code"));

        let status = assert_ok!(fx.pipeline.resume(operation, Answer::Yes));
        assert_ne!(completed(status).node, language);

        // Moving a language item asks nothing.
        let mut as_move = req;
        as_move.mode = DragMode::Move;
        let status = assert_ok!(fx.pipeline.start(as_move));
        assert!(matches!(status, DragStatus::Completed(_)));
    }

    #[test]
    fn guard__link_warning_threshold_is_strict() {
        let at = fixture_with(
            Toggles::default(),
            StaticLinks { referrers: 250 },
            RecordingFrontend::default(),
        );
        let status = assert_ok!(at
            .pipeline
            .start(request(&at, at.a, DropPosition::After, DragMode::Move)));
        assert!(matches!(status, DragStatus::Completed(_)));

        let over = fixture_with(
            Toggles::default(),
            StaticLinks { referrers: 251 },
            RecordingFrontend::default(),
        );
        let (_, prompt) = awaiting(assert_ok!(over
            .pipeline
            .start(request(&over, over.a, DropPosition::After, DragMode::Move))));
        assert!(prompt.contains("a long time"));

        // Copies skip the link warning entirely.
        let copy = fixture_with(
            Toggles::default(),
            StaticLinks { referrers: 251 },
            RecordingFrontend::default(),
        );
        let status = assert_ok!(copy
            .pipeline
            .start(request(&copy, copy.a, DropPosition::After, DragMode::Copy)));
        assert!(matches!(status, DragStatus::Completed(_)));
    }

    #[test]
    fn guard__link_threshold_is_configurable() {
        let fx = fixture_with(
            Toggles::default(),
            StaticLinks { referrers: 1 },
            RecordingFrontend::default(),
        );
        let pipeline = DragPipeline::new(
            Arc::clone(&fx.repo),
            Arc::new(Toggles::default()),
            Arc::new(StaticLinks { referrers: 1 }),
            Arc::clone(&fx.frontend),
            Arc::clone(&fx.jobs),
        )
        .with_config(PipelineConfig {
            link_warning_threshold: 0,
        });

        let (_, prompt) = awaiting(assert_ok!(
            pipeline.start(request(&fx, fx.a, DropPosition::After, DragMode::Move))
        ));
        assert!(prompt.contains("a long time"));
    }

    #[test]
    fn guard__cross_store_source_is_rejected() {
        let fx = fixture();
        let foreign = fx
            .repo
            .add_node(
                Some(fx.source_parent),
                NodeSpec::named("import").with_origin("web"),
            )
            .unwrap();
        let req = DragRequest {
            source: foreign,
            target: fx.root,
            position: DropPosition::Into,
            mode: DragMode::Move,
            confirm: false,
        };

        let reason = aborted(assert_ok!(fx.pipeline.start(req)));
        assert!(reason.unwrap().contains("another database"));
        assert_eq!(fx.frontend.alerts().len(), 1);
        assert_eq!(fx.repo.parent_of(foreign).unwrap(), Some(fx.source_parent));
    }

    #[test]
    fn guard__shadowed_source_asks_before_moving() {
        let fx = fixture();
        let shadowed = fx
            .repo
            .add_node(
                Some(fx.source_parent),
                NodeSpec::named("mirrored").shadowed().with_sort_key(10),
            )
            .unwrap();
        let req = DragRequest {
            source: shadowed,
            target: fx.root,
            position: DropPosition::Into,
            mode: DragMode::Move,
            confirm: false,
        };

        let (operation, prompt) = awaiting(assert_ok!(fx.pipeline.start(req)));
        assert!(prompt.contains("other locations"));
        assert!(prompt.contains("'mirrored'"));

        let status = assert_ok!(fx.pipeline.resume(operation, Answer::Yes));
        assert_eq!(completed(status).node, shadowed);
        assert_eq!(fx.repo.parent_of(shadowed).unwrap(), Some(fx.root));
    }

    #[test]
    fn guard__virtual_source_asks_too() {
        let fx = fixture();
        let ghost = fx
            .repo
            .add_node(Some(fx.source_parent), NodeSpec::named("ghost").virtual_item())
            .unwrap();
        let req = DragRequest {
            source: ghost,
            target: fx.root,
            position: DropPosition::Into,
            mode: DragMode::Copy,
            confirm: false,
        };

        let (_, prompt) = awaiting(assert_ok!(fx.pipeline.start(req)));
        assert!(prompt.contains("Are you sure you want to copy 'ghost'?"));
    }

    #[test]
    fn guard__dropping_onto_itself_is_rejected() {
        let fx = fixture();

        let reason = aborted(assert_ok!(fx.pipeline.start(request(
            &fx,
            fx.source,
            DropPosition::Into,
            DragMode::Move,
        ))));
        assert_eq!(reason.unwrap(), "You cannot drag an item onto itself.");

        // Dropping beside a child resolves to the same destination.
        let child = fx
            .repo
            .add_node(Some(fx.source), NodeSpec::named("child"))
            .unwrap();
        let reason = aborted(assert_ok!(fx.pipeline.start(request(
            &fx,
            child,
            DropPosition::Before,
            DragMode::Move,
        ))));
        assert_eq!(reason.unwrap(), "You cannot drag an item onto itself.");
    }

    #[test]
    fn guard__dropping_into_own_subtree_is_rejected() {
        let fx = fixture();
        let child = fx
            .repo
            .add_node(Some(fx.source), NodeSpec::named("child"))
            .unwrap();
        let grandchild = fx
            .repo
            .add_node(Some(child), NodeSpec::named("grandchild"))
            .unwrap();

        let reason = aborted(assert_ok!(fx.pipeline.start(request(
            &fx,
            grandchild,
            DropPosition::Into,
            DragMode::Move,
        ))));
        assert_eq!(reason.unwrap(), "You cannot drag an item to a subitem.");
    }

    #[test]
    fn guard__protected_items_move_never_copy_fine() {
        let fx = fixture();
        let locked = fx
            .repo
            .add_node(
                Some(fx.source_parent),
                NodeSpec::named("locked").protected(),
            )
            .unwrap();
        let mut req = request(&fx, fx.root, DropPosition::Into, DragMode::Move);
        req.source = locked;

        let reason = aborted(assert_ok!(fx.pipeline.start(req.clone())));
        assert_eq!(reason.unwrap(), "You cannot move a protected item.");

        req.mode = DragMode::Copy;
        assert!(matches!(
            assert_ok!(fx.pipeline.start(req)),
            DragStatus::Completed(_),
        ));
    }

    #[test]
    fn guard__access_policy_denials() {
        let fx = fixture_with(
            Toggles {
                create: false,
                ..Toggles::default()
            },
            StaticLinks::default(),
            RecordingFrontend::default(),
        );
        let reason = aborted(assert_ok!(fx.pipeline.start(request(
            &fx,
            fx.root,
            DropPosition::Into,
            DragMode::Move,
        ))));
        assert_eq!(
            reason.unwrap(),
            "You do not have permission to create items here.",
        );

        let fx = fixture_with(
            Toggles {
                move_to: false,
                ..Toggles::default()
            },
            StaticLinks::default(),
            RecordingFrontend::default(),
        );
        let reason = aborted(assert_ok!(fx.pipeline.start(request(
            &fx,
            fx.root,
            DropPosition::Into,
            DragMode::Move,
        ))));
        assert_eq!(
            reason.unwrap(),
            "You do not have permission to move the item to the new location",
        );

        let fx = fixture_with(
            Toggles {
                copy_to: false,
                ..Toggles::default()
            },
            StaticLinks::default(),
            RecordingFrontend::default(),
        );
        let reason = aborted(assert_ok!(fx.pipeline.start(request(
            &fx,
            fx.root,
            DropPosition::Into,
            DragMode::Copy,
        ))));
        assert_eq!(
            reason.unwrap(),
            "You do not have permission to copy the item to the new location.",
        );
    }

    #[test]
    fn guard__editor_state_blocks_quietly() {
        let fx = fixture_with(
            Toggles::default(),
            StaticLinks::default(),
            RecordingFrontend::blocked(),
        );

        let status = assert_ok!(fx.pipeline.start(request(
            &fx,
            fx.a,
            DropPosition::After,
            DragMode::Move,
        )));

        assert_eq!(aborted(status), None);
        assert!(fx.frontend.alerts().is_empty());
        assert_eq!(fx.pipeline.pending_count(), 0);
        assert_eq!(
            fx.repo.parent_of(fx.source).unwrap(),
            Some(fx.source_parent),
        );
    }

    // ===== Errors and the completion channel =====

    #[test]
    fn start__missing_nodes_surface_not_found() {
        let fx = fixture();
        let ghost = NodeId::random();

        let mut req = request(&fx, fx.a, DropPosition::After, DragMode::Move);
        req.source = ghost;
        let err = assert_err!(fx.pipeline.start(req));
        assert!(matches!(
            err,
            ShellError::Tree(TreeError::NotFound(id)) if id == ghost,
        ));

        let req = request(&fx, ghost, DropPosition::After, DragMode::Move);
        assert_err!(fx.pipeline.start(req));
    }

    #[test]
    fn watch__resolves_after_the_final_postback() {
        let fx = fixture();
        let mut req = request(&fx, fx.a, DropPosition::After, DragMode::Move);
        req.confirm = true;

        let (status, mut watch) = fx.pipeline.start_watched(req);
        let (operation, _) = awaiting(assert_ok!(status));
        assert!(watch.try_recv().is_err());

        let _resumed = assert_ok!(fx.pipeline.resume(operation, Answer::Yes));
        match watch.try_recv() {
            Ok(DragStatus::Completed(outcome)) => assert_eq!(outcome.node, fx.source),
            other => panic!("expected completion on the watch channel, got {other:?}"),
        }
    }

    #[test]
    fn watch__resolves_immediately_for_direct_runs() {
        let fx = fixture();

        let (status, mut watch) = fx
            .pipeline
            .start_watched(request(&fx, fx.a, DropPosition::After, DragMode::Move));
        assert!(matches!(assert_ok!(status), DragStatus::Completed(_)));

        assert!(matches!(watch.try_recv(), Ok(DragStatus::Completed(_))));
    }

    #[test]
    fn watch__decline_reports_the_abort() {
        let fx = fixture();
        let mut req = request(&fx, fx.a, DropPosition::After, DragMode::Move);
        req.confirm = true;

        let (status, mut watch) = fx.pipeline.start_watched(req);
        let (operation, _) = awaiting(assert_ok!(status));
        let _declined = assert_ok!(fx.pipeline.resume(operation, Answer::No));

        assert!(matches!(
            watch.try_recv(),
            Ok(DragStatus::Aborted { reason: None }),
        ));
    }

    #[test]
    fn permit_all__lets_a_plain_move_through() {
        let repo = Arc::new(MemoryRepository::new("master"));
        let root = repo.add_node(None, NodeSpec::named("root")).unwrap();
        let a = repo
            .add_node(Some(root), NodeSpec::named("a").with_sort_key(0))
            .unwrap();
        let source = repo
            .add_node(Some(root), NodeSpec::named("page").with_sort_key(100))
            .unwrap();

        let pipeline = DragPipeline::new(
            Arc::clone(&repo),
            Arc::new(PermitAll),
            Arc::new(StaticLinks::default()),
            Arc::new(RecordingFrontend::default()),
            Arc::new(RecordingJobs::default()),
        );

        let status = assert_ok!(pipeline.start(DragRequest {
            source,
            target: a,
            position: DropPosition::Before,
            mode: DragMode::Move,
            confirm: false,
        }));
        assert_eq!(completed(status).sort_key, Some(-100));
    }
}
