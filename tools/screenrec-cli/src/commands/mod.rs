pub mod check;
pub mod displays;
pub mod record;
pub mod windows;
