use super::{BuildContext, BuildStrategy};
use crate::StrategyId;
use rubypack_core::{BuildError, BuildResult};

/// Selected when `Gemfile.lock` is missing. Always fails the build.
pub struct NoLockfileStrategy;

impl BuildStrategy for NoLockfileStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::NoLockfile
    }

    fn compile(&self, _ctx: &mut BuildContext<'_>) -> BuildResult<()> {
        Err(BuildError::LockfileMissing)
    }
}
