pub mod check;
pub mod completions;
pub mod credentials;
pub mod profiles;
