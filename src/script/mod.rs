pub mod composer;
pub mod model;
pub mod parser;

pub use composer::ScriptComposer;
pub use model::{Script, Segment, VisualCue};
pub use parser::parse_script;
