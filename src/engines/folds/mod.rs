pub mod base;
pub mod date;
pub mod position;
pub mod types;

pub use base::FoldPlanner;
pub use date::DateArithmeticPlanner;
pub use position::PositionIndexPlanner;
pub use types::{FoldConfig, WindowType};

/// Date arithmetic when one period has a constant length, position index
/// otherwise.
pub fn planner_for(config: FoldConfig, period: Option<i64>) -> Box<dyn FoldPlanner> {
    match period {
        Some(period) => Box::new(DateArithmeticPlanner::new(config, period)),
        None => Box::new(PositionIndexPlanner::new(config)),
    }
}
