mod app_state;
mod settings;

pub use app_state::AppState;
pub use settings::{default_data_dir, load_settings, save_settings, SyncSettings};
