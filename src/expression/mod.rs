pub mod condition;
pub mod order;
pub mod pattern;

pub use condition::{Condition, Operand, Operator, Parameters, ValueSource};
pub use order::{Direction, OrderBy};
pub use pattern::eval_like;
