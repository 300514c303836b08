pub mod pins;
pub mod run;
