pub mod import_json;
pub mod import_spreadsheet;
pub mod push;
pub mod utils;
