mod category_picker;
mod command_input;
mod confirm_dialog;
mod input;
mod key_result;
mod search_input;

pub use category_picker::{CategoryPicker, CategoryPickerEvent};
pub use command_input::{CommandEvent, CommandInput};
pub use confirm_dialog::{ConfirmDialog, ConfirmEvent};
pub use input::{InputResult, TextInput};
pub use key_result::KeyResult;
pub use search_input::{SearchEvent, SearchInput};
