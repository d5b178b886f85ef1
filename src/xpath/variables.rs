//! XPath variable bindings
//!
//! A variable has a fixed type chosen when it is added. Compiled queries
//! hold shared handles to the variables they reference, so values set after
//! compilation are seen by the next evaluation.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::nodeset::XPathNodeSet;
use super::value::{XPathType, XPathValue};

/// A named, typed variable
pub struct XPathVariable {
    name: String,
    value: RefCell<XPathValue>,
}

impl XPathVariable {
    fn new(name: &str, var_type: XPathType) -> Option<Self> {
        let value = match var_type {
            XPathType::NodeSet => XPathValue::empty_nodeset(),
            XPathType::Number => XPathValue::Number(0.0),
            XPathType::String => XPathValue::String(String::new()),
            XPathType::Boolean => XPathValue::Boolean(false),
            XPathType::None => return None,
        };
        Some(XPathVariable {
            name: name.to_string(),
            value: RefCell::new(value),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> XPathType {
        self.value.borrow().value_type()
    }

    /// Current value; false unless this is a boolean variable
    pub fn get_boolean(&self) -> bool {
        match &*self.value.borrow() {
            XPathValue::Boolean(b) => *b,
            _ => false,
        }
    }

    /// Current value; NaN unless this is a number variable
    pub fn get_number(&self) -> f64 {
        match &*self.value.borrow() {
            XPathValue::Number(n) => *n,
            _ => f64::NAN,
        }
    }

    pub fn get_string(&self) -> String {
        match &*self.value.borrow() {
            XPathValue::String(s) => s.clone(),
            _ => String::new(),
        }
    }

    pub fn get_node_set(&self) -> XPathNodeSet {
        match &*self.value.borrow() {
            XPathValue::NodeSet(nodes) => nodes.clone(),
            _ => XPathNodeSet::new(),
        }
    }

    /// Store `value` if it has the variable's type
    fn store(&self, value: XPathValue) -> bool {
        let mut slot = self.value.borrow_mut();
        if slot.value_type() != value.value_type() {
            return false;
        }
        *slot = value;
        true
    }

    pub fn set_boolean(&self, value: bool) -> bool {
        self.store(XPathValue::Boolean(value))
    }

    pub fn set_number(&self, value: f64) -> bool {
        self.store(XPathValue::Number(value))
    }

    pub fn set_string(&self, value: &str) -> bool {
        self.store(XPathValue::String(value.to_string()))
    }

    pub fn set_node_set(&self, value: XPathNodeSet) -> bool {
        self.store(XPathValue::NodeSet(value))
    }

    pub(crate) fn value(&self) -> XPathValue {
        self.value.borrow().clone()
    }
}

impl fmt::Debug for XPathVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XPathVariable")
            .field("name", &self.name)
            .field("value", &*self.value.borrow())
            .finish()
    }
}

/// Named variables available to query compilation
#[derive(Debug, Default)]
pub struct XPathVariableSet {
    vars: IndexMap<String, Rc<XPathVariable>>,
}

impl XPathVariableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable, or return the existing one of the same name
    ///
    /// Fails when the name is empty, the type is `None`, or a variable of
    /// that name already exists with a different type.
    pub fn add(&mut self, name: &str, var_type: XPathType) -> Option<Rc<XPathVariable>> {
        if name.is_empty() {
            return None;
        }
        if let Some(existing) = self.vars.get(name) {
            return (existing.value_type() == var_type).then(|| Rc::clone(existing));
        }
        let var = Rc::new(XPathVariable::new(name, var_type)?);
        self.vars.insert(name.to_string(), Rc::clone(&var));
        Some(var)
    }

    pub fn get(&self, name: &str) -> Option<Rc<XPathVariable>> {
        self.vars.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Variables in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Rc<XPathVariable>> {
        self.vars.values()
    }

    pub fn set_boolean(&mut self, name: &str, value: bool) -> bool {
        self.add(name, XPathType::Boolean)
            .is_some_and(|v| v.set_boolean(value))
    }

    pub fn set_number(&mut self, name: &str, value: f64) -> bool {
        self.add(name, XPathType::Number)
            .is_some_and(|v| v.set_number(value))
    }

    pub fn set_string(&mut self, name: &str, value: &str) -> bool {
        self.add(name, XPathType::String)
            .is_some_and(|v| v.set_string(value))
    }

    pub fn set_node_set(&mut self, name: &str, value: XPathNodeSet) -> bool {
        self.add(name, XPathType::NodeSet)
            .is_some_and(|v| v.set_node_set(value))
    }
}

/// Copies are independent: queries compiled against the original keep
/// seeing the original's values.
impl Clone for XPathVariableSet {
    fn clone(&self) -> Self {
        let vars = self
            .vars
            .iter()
            .map(|(name, var)| {
                let copy = XPathVariable {
                    name: var.name.clone(),
                    value: RefCell::new(var.value()),
                };
                (name.clone(), Rc::new(copy))
            })
            .collect();
        XPathVariableSet { vars }
    }
}
