pub mod compare;
pub mod traits;
pub mod web;

pub use traits::{DialogRecord, UiDriver};
pub use web::{BrowserEngine, WebDriver, WebDriverConfig};
