use std::path::{Path, PathBuf};
use std::sync::Arc;

use soapci::build::StagedBuild;
use soapci::engine::{BranchRuntime, BranchTarget, BuildQueue};
use soapci::exec::ShellSession;
use soapci::fs::mock::{MockEntry, MockFileSystem};
use soapci::macros::{self, MacroContext, MacroLayer};
use soapci::record::ResultRecorder;

use crate::fake_executor::FakeExecutor;
use crate::fake_oracle::FakeOracle;

pub const REPO: &str = "widget";
pub const BRANCH: &str = "main";
pub const STATE_DIR: &str = "/ws/repos/widget/branches";
pub const WORKTREE: &str = "/ws/repos/widget/branches/main";
pub const OUTPUT_ROOT: &str = "/ws/results";
pub const SUCCESS_IMAGE: &str = "/ws/assets/success.png";
pub const FAILURE_IMAGE: &str = "/ws/assets/failure.png";

/// A branch runtime wired to in-memory fakes, with handles kept for
/// inspection.
pub struct BranchHarness {
    pub fs: MockFileSystem,
    pub executor: FakeExecutor,
    pub oracle: FakeOracle,
    pub runtime: BranchRuntime,
}

/// Reserved names for `widget`/`main`, plus `extra` in the global layer.
pub fn branch_macros(extra: &[(&str, &str)]) -> MacroContext {
    MacroContext::builder()
        .define_all(
            MacroLayer::Global,
            extra.iter().map(|(k, v)| (k.to_string(), v.to_string())),
        )
        .define(MacroLayer::Reserved, macros::REPO_NAME, REPO)
        .define(MacroLayer::Reserved, macros::BRANCH_NAME, BRANCH)
        .define(MacroLayer::Reserved, macros::BRANCH_NAME_SAFE, BRANCH)
        .define(MacroLayer::Reserved, macros::BRANCH_WORKING_DIR, WORKTREE)
        .build()
        .expect("valid macro context")
}

impl BranchHarness {
    pub fn new(build: StagedBuild, oracle: FakeOracle) -> Self {
        Self::with_macros(build, oracle, branch_macros(&[]))
    }

    pub fn with_macros(build: StagedBuild, oracle: FakeOracle, macros: MacroContext) -> Self {
        let fs = MockFileSystem::new();
        let executor = FakeExecutor::new();

        let shared: Arc<dyn soapci::fs::FileSystem> = Arc::new(fs.clone());
        let queue = BuildQueue::new(shared.clone(), STATE_DIR, BRANCH);
        let recorder = ResultRecorder::new(shared, OUTPUT_ROOT, SUCCESS_IMAGE, FAILURE_IMAGE);
        let session = ShellSession::new(Arc::new(executor.clone()), WORKTREE);

        let runtime = BranchRuntime::new(
            BranchTarget::new(REPO, BRANCH, WORKTREE),
            macros,
            build,
            queue,
            Arc::new(oracle.clone()),
            recorder,
            session,
        );

        Self {
            fs,
            executor,
            oracle,
            runtime,
        }
    }

    pub fn queue_path(&self) -> PathBuf {
        self.runtime.queue().queue_path()
    }

    pub fn marker_path(&self) -> PathBuf {
        self.runtime.queue().marker_path()
    }

    pub fn watermark_path(&self) -> PathBuf {
        self.runtime.queue().watermark_path()
    }

    /// Text content of a mock file, or `None` if it is missing or not a file.
    pub fn file_text(&self, path: impl AsRef<Path>) -> Option<String> {
        match self.fs.entry(path) {
            Some(MockEntry::File(bytes)) => String::from_utf8(bytes).ok(),
            _ => None,
        }
    }

    pub fn result_dir(&self, commit: &str) -> PathBuf {
        Path::new(OUTPUT_ROOT).join(REPO).join(BRANCH).join(commit)
    }
}
