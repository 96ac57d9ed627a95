//! CLI domain: parse, route and output only. Generation itself lives in the library modules.

mod output;
mod parse;
mod route;

pub use output::{format_report_text, format_sections_text, map_error};
pub use parse::{Cli, Commands};
pub use route::RunContext;
