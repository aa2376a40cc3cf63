pub mod critical;
pub mod fonts;
pub mod matcher;
pub mod stylesheet;
