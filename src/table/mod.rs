pub mod builder;
pub mod decorator;
pub mod html;
pub mod scaffold;
pub mod view;

pub use builder::{ModelFieldTable, ModelIndexTable, ModelTable};
pub use decorator::{
    ActionDecorator, Decorator, EntryDecorator, FormatDecorator, LocalizeDecorator, OptionDecorator, PropertyDecorator,
};
pub use scaffold::{DEFAULT_PAGINATION, OrderMethod, OrderSetting, ScaffoldTable, SearchSetting};
pub use view::{TableAction, TableCell, TableRow, TableView};
