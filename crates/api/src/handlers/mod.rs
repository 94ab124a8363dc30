pub mod generate;
pub mod layouts;
