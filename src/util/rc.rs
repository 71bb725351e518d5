use std::{cell::RefCell, rc::Rc};

// Shorthand for single-threaded shared mutable pointers,
// to avoid the nested ::new at construction sites.
pub type RcRefCell<T> = Rc<RefCell<T>>;

// Namespace struct, so the alias can _kind of_ have associated functions.
// A mod would also work, but the linter wants mods to be snake_case,
// which doesn't match the type name very well.
pub struct RcRefCellT(());

impl RcRefCellT {
    pub fn new<T>(t: T) -> RcRefCell<T> {
        Rc::new(RefCell::new(t))
    }
}
