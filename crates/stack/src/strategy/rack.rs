use super::{BuildContext, BuildStrategy, RubyStrategy};
use crate::StrategyId;
use rubypack_core::BuildResult;

/// Rack application without Rails. Only the generic Ruby steps apply.
pub struct RackStrategy;

impl BuildStrategy for RackStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::Rack
    }

    fn compile(&self, ctx: &mut BuildContext<'_>) -> BuildResult<()> {
        RubyStrategy::run_generic_steps(ctx)
    }
}
