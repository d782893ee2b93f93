//! A server-rendered component toolkit.
//!
//! Application code builds a [`ComponentTree`] on the server. The tree renders to markup for
//! the browser, sends [`Instruction`]s through the [`Session`] when attached components change,
//! and routes browser events back to the component they address.

mod component;
mod composite;
mod container;
mod dialog;
mod error;
pub mod events;
mod host;
mod id;
pub mod instruction;
pub mod markup;
pub mod redraw;
mod router;
mod session;
mod settings;
mod table;
mod timer;
mod tree;
mod widgets;

pub use component::{Component, Kind};
pub use composite::{DropButton, Tab, Tabs, TreeNode, TreeView};
pub use container::{Container, Layout};
pub use dialog::Dialog;
pub use error::{Error, Result};
pub use events::{EventKind, Listener};
pub use host::{Envelope, EventSender, Host};
pub use id::ComponentId;
pub use instruction::{Instruction, Level};
pub use router::Dispatch;
pub use session::{QueueChannel, RemoteChannel, Session};
pub use settings::Settings;
pub use table::{SortOrder, Table};
pub use timer::Timer;
pub use tree::ComponentTree;
pub use widgets::{Button, CheckBox, ContextMenu, Label, NumberField, TextField};
