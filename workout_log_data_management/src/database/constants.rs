pub const KEY_VALUE_TABLE_NAME: &str = "KeyValue";
pub const KEY: &str = "key";
pub const VALUE: &str = "value";
