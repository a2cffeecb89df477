use super::{value::Value, EResult};
use crate::distribution::Distribution;
use crate::error::EvalError;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// What a variable holds. Sampling-mode assignments store a [`Value`];
/// distribution-mode assignments store the law of the assigned expression,
/// or one law per component when the expression is a sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Value(Value),
    Distribution(Distribution),
    Distributions(Vec<Distribution>),
}

impl Binding {
    pub fn value(&self) -> Value {
        match self {
            Self::Value(v) => v.clone(),
            Self::Distribution(d) => Value::Distribution(d.clone()),
            Self::Distributions(ds) => ds.iter().cloned().collect(),
        }
    }

    pub fn sequence(&self) -> Vec<Value> {
        match self {
            Self::Value(v) => v.clone().into_items(),
            Self::Distribution(d) => vec![Value::Distribution(d.clone())],
            Self::Distributions(ds) => ds.iter().cloned().map(Value::Distribution).collect(),
        }
    }

    pub fn distribution(&self) -> EResult<Distribution> {
        match self {
            Self::Value(v) => v.to_distribution(),
            Self::Distribution(d) => Ok(d.clone()),
            Self::Distributions(_) => Err(EvalError::unsupported(
                "take the distribution of",
                "a sequence variable",
            )),
        }
    }

    pub fn distribution_sequence(&self) -> EResult<Vec<Distribution>> {
        match self {
            Self::Value(Value::Seq(items)) => items.iter().map(Value::to_distribution).collect(),
            Self::Value(v) => Ok(vec![v.to_distribution()?]),
            Self::Distribution(d) => Ok(vec![d.clone()]),
            Self::Distributions(ds) => Ok(ds.clone()),
        }
    }
}

impl From<Value> for Binding {
    fn from(v: Value) -> Self {
        Self::Value(v)
    }
}

impl From<Distribution> for Binding {
    fn from(d: Distribution) -> Self {
        Self::Distribution(d)
    }
}

/// One lexical scope. Frames chain to the frame enclosing them where they
/// were written, not where they were called from.
#[derive(Debug, Default)]
pub struct Frame {
    bindings: RefCell<HashMap<String, Binding>>,
    parent: Option<Rc<Frame>>,
}

impl Frame {
    pub fn root() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn child(parent: &Rc<Self>) -> Rc<Self> {
        Rc::new(Self {
            bindings: RefCell::default(),
            parent: Some(Rc::clone(parent)),
        })
    }

    /// Walks the chain innermost-first.
    pub fn lookup(&self, name: &str) -> EResult<Binding> {
        let mut frame = self;
        loop {
            if let Some(binding) = frame.bindings.borrow().get(name) {
                return Ok(binding.clone());
            }
            match &frame.parent {
                Some(parent) => frame = parent.as_ref(),
                None => {
                    return Err(EvalError::UnboundVariable {
                        name: name.to_owned(),
                    })
                }
            }
        }
    }

    /// Always writes to this frame, shadowing any outer binding.
    pub fn assign(&self, name: impl Into<String>, binding: Binding) {
        self.bindings.borrow_mut().insert(name.into(), binding);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::Number;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lookup_walks_outward() {
        let root = Frame::root();
        root.assign("x", Value::from(1).into());
        let inner = Frame::child(&Frame::child(&root));
        assert_eq!(inner.lookup("x"), Ok(Binding::Value(Value::from(1))));
    }

    #[test]
    fn test_assign_shadows() {
        let root = Frame::root();
        root.assign("x", Value::from(1).into());
        let inner = Frame::child(&root);
        inner.assign("x", Value::from(2).into());

        assert_eq!(inner.lookup("x"), Ok(Binding::Value(Value::from(2))));
        assert_eq!(root.lookup("x"), Ok(Binding::Value(Value::from(1))));
    }

    #[test]
    fn test_unbound() {
        let inner = Frame::child(&Frame::root());
        assert_eq!(
            inner.lookup("nope"),
            Err(EvalError::UnboundVariable {
                name: "nope".to_owned()
            })
        );
    }

    #[test]
    fn test_binding_views() {
        let seq = Binding::Value(Value::Seq(vec![Value::from(3), Value::from(4)]));
        assert_eq!(seq.sequence().len(), 2);
        assert_eq!(seq.distribution_sequence().unwrap()[1], Distribution::certain(Number::Int(4)));
        assert!(seq.distribution().is_err());

        let law = Binding::Distribution(Distribution::certain(Number::Int(9)));
        assert_eq!(law.distribution_sequence().unwrap().len(), 1);
        assert_eq!(law.value(), Value::Distribution(Distribution::certain(Number::Int(9))));
    }
}
