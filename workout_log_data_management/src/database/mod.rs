pub mod constants;
pub mod db;
