mod add;
mod list;
mod run;

pub use add::run_add;
pub use list::run_list;
pub use run::run_run;
