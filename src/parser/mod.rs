pub mod types;
pub mod yaml;

pub use types::{Locator, VerificationFlow, VerificationStep};
pub use yaml::{parse_flow_content, parse_flow_file};
