//! CLI command implementations.
//!
//! | Module | Flags handled                                            |
//! |--------|----------------------------------------------------------|
//! | `list` | `--list`                                                 |
//! | `run`  | `--spec`, `--max-iterations`, `--model`, Ctrl-C steering |

pub mod list;
pub mod run;

pub use list::cmd_list;
pub use run::cmd_run;
