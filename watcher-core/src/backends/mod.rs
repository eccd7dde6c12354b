pub mod gates;
pub mod mock;
pub mod nmcli;
pub mod notifiers;
mod utils;
pub mod wpa_cli;
