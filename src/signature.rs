use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// # TensorSignature
///
/// Identifies a batchable call shape: the set of input tensor names paired
/// with the set of output tensor names.
///
/// Two calls belong to the same signature exactly when those two sets are
/// equal, regardless of the order the caller listed them in. The signature is
/// immutable after construction and serves as the key that routes a call to
/// its batch scheduler.
///
/// The name sets are kept ordered, which freezes one iteration order per
/// signature. The input merger, the engine invocation, and the output
/// splitter all rely on that single order so that merged tensor `i` always
/// lines up with output tensor `i`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TensorSignature {
    input_tensors: BTreeSet<String>,
    output_tensors: BTreeSet<String>,
}

impl TensorSignature {
    /// Creates a signature from explicit input and output tensor names.
    ///
    /// Duplicate names collapse, since the underlying storage is a set.
    pub fn new<I, O>(input_tensors: I, output_tensors: O) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        Self {
            input_tensors: input_tensors.into_iter().map(Into::into).collect(),
            output_tensors: output_tensors.into_iter().map(Into::into).collect(),
        }
    }

    /// Derives the signature of one call from its run arguments.
    pub fn from_run_args<T>(
        inputs: &[(String, T)],
        output_tensor_names: &[String],
    ) -> Self {
        Self {
            input_tensors: inputs.iter().map(|(name, _)| name.clone()).collect(),
            output_tensors: output_tensor_names.iter().cloned().collect(),
        }
    }

    /// Builds the signature declared by a structured model signature.
    pub fn from_signature_def(signature_def: &SignatureDef) -> Self {
        Self::from_signature_defs(std::slice::from_ref(signature_def))
    }

    /// Builds one signature covering the union of several model signatures.
    ///
    /// Useful when a single batch scheduler should serve calls that touch any
    /// of a group of declared signatures.
    pub fn from_signature_defs(signature_defs: &[SignatureDef]) -> Self {
        let mut signature = Self::default();
        for signature_def in signature_defs {
            for tensor_info in signature_def.inputs.values() {
                signature.input_tensors.insert(tensor_info.name.clone());
            }
            for tensor_info in signature_def.outputs.values() {
                signature.output_tensors.insert(tensor_info.name.clone());
            }
        }
        signature
    }

    /// The set of input tensor names, in the signature's frozen order.
    pub fn input_tensors(&self) -> &BTreeSet<String> {
        &self.input_tensors
    }

    /// The set of output tensor names, in the signature's frozen order.
    pub fn output_tensors(&self) -> &BTreeSet<String> {
        &self.output_tensors
    }
}

impl fmt::Display for TensorSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |names: &BTreeSet<String>| {
            names.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
        };
        write!(
            f,
            "{{input_tensors: <{}>, output_tensors: <{}>}}",
            join(&self.input_tensors),
            join(&self.output_tensors),
        )
    }
}

/// Name of the concrete tensor backing one logical input or output of a
/// model signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TensorInfo {
    pub name: String,
}

impl TensorInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A structured model-signature descriptor: logical names mapped to the
/// tensors that carry them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignatureDef {
    pub inputs: HashMap<String, TensorInfo>,
    pub outputs: HashMap<String, TensorInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;

    #[test]
    fn test_equality_ignores_declaration_order() {
        let a = TensorSignature::new(["x", "z"], ["y"]);
        let b = TensorSignature::new(["z", "x"], ["y"]);

        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_sets_are_unequal() {
        let a = TensorSignature::new(["x"], ["y"]);
        let b = TensorSignature::new(["x2"], ["y"]);
        let c = TensorSignature::new(["x"], ["y2"]);

        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_usable_as_map_key_independent_of_order() {
        let mut map = StdHashMap::new();
        map.insert(TensorSignature::new(["a", "b"], ["y"]), 1);

        // Same sets, different declaration order, must hit the same slot.
        assert_eq!(map.get(&TensorSignature::new(["b", "a"], ["y"])), Some(&1));
        assert_eq!(map.get(&TensorSignature::new(["a"], ["y"])), None);
    }

    #[test]
    fn test_from_run_args_deduplicates() {
        let inputs = vec![
            ("x".to_string(), 0u8),
            ("x".to_string(), 0u8),
            ("w".to_string(), 0u8),
        ];
        let outputs = vec!["y".to_string(), "y".to_string()];

        let signature = TensorSignature::from_run_args(&inputs, &outputs);

        assert_eq!(signature.input_tensors().len(), 2);
        assert_eq!(signature.output_tensors().len(), 1);
    }

    #[test]
    fn test_from_signature_defs_takes_union() {
        let mut first = SignatureDef::default();
        first.inputs.insert("in".to_string(), TensorInfo::new("x:0"));
        first.outputs.insert("out".to_string(), TensorInfo::new("y:0"));

        let mut second = SignatureDef::default();
        second.inputs.insert("in".to_string(), TensorInfo::new("x2:0"));
        second.outputs.insert("out".to_string(), TensorInfo::new("y:0"));

        let signature = TensorSignature::from_signature_defs(&[first, second]);

        assert_eq!(
            signature.input_tensors().iter().cloned().collect::<Vec<_>>(),
            vec!["x2:0".to_string(), "x:0".to_string()]
        );
        assert_eq!(
            signature.output_tensors().iter().cloned().collect::<Vec<_>>(),
            vec!["y:0".to_string()]
        );
    }

    #[test]
    fn test_display_renders_both_sets() {
        let signature = TensorSignature::new(["b", "a"], ["y"]);
        assert_eq!(
            signature.to_string(),
            "{input_tensors: <a, b>, output_tensors: <y>}"
        );
    }
}
