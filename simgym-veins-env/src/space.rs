//! Values and descriptions of gym spaces.
//!
//! [`SpaceValue`] is the in-memory form of a [`proto::Space`]: observations,
//! rewards and actions all travel as space values. [`SpaceSpec`] is what the
//! agent knows about a space before any value arrived. The simulator announces
//! its spaces as gym constructor code (e.g. `gym.spaces.Box(low=0, high=1, shape=(4,))`),
//! and [`SpaceSpec::parse`] extracts the shape from it where it can.
use crate::proto::{self, space::Value};
use simgym_core::EnvError;

/// A value of a gym space.
#[derive(Debug, Clone, PartialEq)]
pub enum SpaceValue {
    /// Continuous values of fixed arity.
    Box(Vec<f64>),

    /// A categorical value.
    Discrete(u64),

    /// Several categorical values.
    MultiDiscrete(Vec<u64>),

    /// Several binary values.
    MultiBinary(Vec<bool>),

    /// An ordered collection of values.
    Tuple(Vec<SpaceValue>),

    /// Named values, in the order the simulator sent them.
    Dict(Vec<(String, SpaceValue)>),
}

impl SpaceValue {
    /// Returns the number of scalar elements.
    pub fn len(&self) -> usize {
        match self {
            SpaceValue::Box(v) => v.len(),
            SpaceValue::Discrete(_) => 1,
            SpaceValue::MultiDiscrete(v) => v.len(),
            SpaceValue::MultiBinary(v) => v.len(),
            SpaceValue::Tuple(vs) => vs.iter().map(SpaceValue::len).sum(),
            SpaceValue::Dict(items) => items.iter().map(|(_, v)| v.len()).sum(),
        }
    }

    /// Returns `true` if the value holds no scalar element.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if both values have the same kind and layout.
    ///
    /// The values themselves are not compared.
    pub fn same_shape(&self, other: &SpaceValue) -> bool {
        match (self, other) {
            (SpaceValue::Box(a), SpaceValue::Box(b)) => a.len() == b.len(),
            (SpaceValue::Discrete(_), SpaceValue::Discrete(_)) => true,
            (SpaceValue::MultiDiscrete(a), SpaceValue::MultiDiscrete(b)) => a.len() == b.len(),
            (SpaceValue::MultiBinary(a), SpaceValue::MultiBinary(b)) => a.len() == b.len(),
            (SpaceValue::Tuple(a), SpaceValue::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_shape(y))
            }
            (SpaceValue::Dict(a), SpaceValue::Dict(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka == kb && va.same_shape(vb))
            }
            _ => false,
        }
    }

    /// Returns the value as a single real number, if it is one.
    ///
    /// Rewards are sent as a one-element box or as a discrete value.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            SpaceValue::Box(v) if v.len() == 1 => Some(v[0]),
            SpaceValue::Discrete(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Flattens all scalar elements into reals, depth first.
    pub fn flatten(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.len());
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(&self, out: &mut Vec<f64>) {
        match self {
            SpaceValue::Box(v) => out.extend_from_slice(v),
            SpaceValue::Discrete(v) => out.push(*v as f64),
            SpaceValue::MultiDiscrete(v) => out.extend(v.iter().map(|x| *x as f64)),
            SpaceValue::MultiBinary(v) => out.extend(v.iter().map(|x| if *x { 1.0 } else { 0.0 })),
            SpaceValue::Tuple(vs) => vs.iter().for_each(|v| v.flatten_into(out)),
            SpaceValue::Dict(items) => items.iter().for_each(|(_, v)| v.flatten_into(out)),
        }
    }

    /// Short name of the kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            SpaceValue::Box(_) => "box",
            SpaceValue::Discrete(_) => "discrete",
            SpaceValue::MultiDiscrete(_) => "multi_discrete",
            SpaceValue::MultiBinary(_) => "multi_binary",
            SpaceValue::Tuple(_) => "tuple",
            SpaceValue::Dict(_) => "dict",
        }
    }
}

impl From<&SpaceValue> for proto::Space {
    fn from(value: &SpaceValue) -> Self {
        let value = match value {
            SpaceValue::Box(v) => Value::Box(proto::BoxValues { values: v.clone() }),
            SpaceValue::Discrete(v) => Value::Discrete(proto::DiscreteValue { value: *v }),
            SpaceValue::MultiDiscrete(v) => {
                Value::MultiDiscrete(proto::MultiDiscreteValues { values: v.clone() })
            }
            SpaceValue::MultiBinary(v) => {
                Value::MultiBinary(proto::MultiBinaryValues { values: v.clone() })
            }
            SpaceValue::Tuple(vs) => Value::Tuple(proto::TupleValues {
                values: vs.iter().map(proto::Space::from).collect(),
            }),
            SpaceValue::Dict(items) => Value::Dict(proto::DictValues {
                values: items
                    .iter()
                    .map(|(key, v)| proto::DictItem {
                        key: key.clone(),
                        value: Some(v.into()),
                    })
                    .collect(),
            }),
        };
        proto::Space { value: Some(value) }
    }
}

impl TryFrom<proto::Space> for SpaceValue {
    type Error = EnvError;

    fn try_from(space: proto::Space) -> Result<Self, Self::Error> {
        let value = space
            .value
            .ok_or_else(|| EnvError::Protocol("space without a value".to_string()))?;
        Ok(match value {
            Value::Box(b) => SpaceValue::Box(b.values),
            Value::Discrete(d) => SpaceValue::Discrete(d.value),
            Value::MultiDiscrete(m) => SpaceValue::MultiDiscrete(m.values),
            Value::MultiBinary(m) => SpaceValue::MultiBinary(m.values),
            Value::Tuple(t) => SpaceValue::Tuple(
                t.values
                    .into_iter()
                    .map(SpaceValue::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Dict(d) => SpaceValue::Dict(
                d.values
                    .into_iter()
                    .map(|item| {
                        let value = item.value.ok_or_else(|| {
                            EnvError::Protocol(format!("dict item {:?} without a value", item.key))
                        })?;
                        Ok((item.key, SpaceValue::try_from(value)?))
                    })
                    .collect::<Result<_, EnvError>>()?,
            ),
        })
    }
}

/// What is known about a space from its constructor code.
#[derive(Debug, Clone, PartialEq)]
pub enum SpaceSpec {
    /// A box with the given shape.
    Box {
        /// Dimensions; the number of values is their product.
        shape: Vec<usize>,
    },

    /// A discrete space with `n` categories.
    Discrete {
        /// Number of categories.
        n: u64,
    },

    /// A space that could not be understood. Values are not checked against it.
    Opaque(String),
}

impl SpaceSpec {
    /// A one-dimensional box of the given arity.
    pub fn boxed(arity: usize) -> Self {
        SpaceSpec::Box { shape: vec![arity] }
    }

    /// Parses gym space constructor code.
    ///
    /// Understands `Discrete(n)`, `Box(..., shape=(d, ...))` and boxes whose
    /// `low` is a literal list (`np.array([0.0, 0.0])`). Everything else is
    /// returned as [`SpaceSpec::Opaque`].
    pub fn parse(code: &str) -> Self {
        Self::try_parse(code.trim()).unwrap_or_else(|| SpaceSpec::Opaque(code.to_string()))
    }

    fn try_parse(code: &str) -> Option<Self> {
        let open = code.find('(')?;
        let close = code.rfind(')')?;
        if close < open {
            return None;
        }
        let name = code[..open].rsplit('.').next()?.trim();
        let args = split_top_level(&code[open + 1..close]);

        match name {
            "Discrete" => {
                let n = keyword(&args, "n").or_else(|| positional(&args, 0))?;
                n.parse().ok().map(|n| SpaceSpec::Discrete { n })
            }
            "Box" => {
                if let Some(shape) = keyword(&args, "shape").or_else(|| positional(&args, 2)) {
                    return parse_shape(shape).map(|shape| SpaceSpec::Box { shape });
                }
                let low = keyword(&args, "low").or_else(|| positional(&args, 0))?;
                list_shape(low).map(|shape| SpaceSpec::Box { shape })
            }
            _ => None,
        }
    }

    /// Checks that `value` belongs to this space.
    ///
    /// Only the layout is checked; bounds of a box are not.
    pub fn check(&self, value: &SpaceValue) -> Result<(), String> {
        match (self, value) {
            (SpaceSpec::Opaque(_), _) => Ok(()),
            (SpaceSpec::Box { shape }, SpaceValue::Box(v)) => {
                let arity: usize = shape.iter().product();
                if v.len() == arity {
                    Ok(())
                } else {
                    Err(format!(
                        "expected {} values for box of shape {:?}, got {}",
                        arity,
                        shape,
                        v.len()
                    ))
                }
            }
            (SpaceSpec::Discrete { n }, SpaceValue::Discrete(v)) => {
                if v < n {
                    Ok(())
                } else {
                    Err(format!("discrete value {} out of range 0..{}", v, n))
                }
            }
            (SpaceSpec::Box { .. }, other) => Err(format!("expected box, got {}", other.kind())),
            (SpaceSpec::Discrete { .. }, other) => {
                Err(format!("expected discrete, got {}", other.kind()))
            }
        }
    }
}

/// Splits at commas that are not nested in brackets.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = s[start..].trim();
    if !last.is_empty() {
        parts.push(last);
    }
    parts
}

fn is_keyword(arg: &str) -> Option<(&str, &str)> {
    let (key, value) = arg.split_once('=')?;
    let key = key.trim();
    if key.chars().all(|c| c.is_alphanumeric() || c == '_') && !value.starts_with('=') {
        Some((key, value.trim()))
    } else {
        None
    }
}

fn keyword<'a>(args: &[&'a str], name: &str) -> Option<&'a str> {
    args.iter()
        .filter_map(|a| is_keyword(a))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

fn positional<'a>(args: &[&'a str], ix: usize) -> Option<&'a str> {
    args.iter()
        .take_while(|a| is_keyword(a).is_none())
        .nth(ix)
        .copied()
}

/// `(4,)`, `[2, 3]` or `4`.
fn parse_shape(s: &str) -> Option<Vec<usize>> {
    let inner = s
        .trim()
        .trim_start_matches(|c: char| c == '(' || c == '[')
        .trim_end_matches(|c: char| c == ')' || c == ']');
    let dims = split_top_level(inner)
        .into_iter()
        .map(|d| d.parse().ok())
        .collect::<Option<Vec<usize>>>()?;
    if dims.is_empty() {
        None
    } else {
        Some(dims)
    }
}

/// Shape of the first list literal in `s`, e.g. `np.array([[0, 1], [2, 3]])` is `[2, 2]`.
fn list_shape(s: &str) -> Option<Vec<usize>> {
    let open = s.find('[')?;
    let mut depth = 0i32;
    let mut close = None;
    for (i, c) in s[open..].char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(open + i);
                    break;
                }
            }
            _ => {}
        }
    }
    let items = split_top_level(&s[open + 1..close?]);
    let mut shape = vec![items.len()];
    if let Some(first) = items.first() {
        if first.starts_with('[') {
            shape.extend(list_shape(first)?);
        }
    }
    Some(shape)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_box_with_shape() {
        assert_eq!(
            SpaceSpec::parse("gym.spaces.Box(low=-1, high=1, shape=(4,), dtype=np.float32)"),
            SpaceSpec::boxed(4)
        );
        assert_eq!(
            SpaceSpec::parse("Box(0.0, 1.0, (2, 3))"),
            SpaceSpec::Box { shape: vec![2, 3] }
        );
    }

    #[test]
    fn parse_box_from_low_literal() {
        assert_eq!(
            SpaceSpec::parse("gym.spaces.Box(low=np.array([0.0]), high=np.array([1.0]))"),
            SpaceSpec::boxed(1)
        );
        assert_eq!(
            SpaceSpec::parse("spaces.Box(low=np.array([[0, 0], [0, 0], [0, 0]]), high=1)"),
            SpaceSpec::Box { shape: vec![3, 2] }
        );
    }

    #[test]
    fn parse_discrete() {
        assert_eq!(
            SpaceSpec::parse("gym.spaces.Discrete(3)"),
            SpaceSpec::Discrete { n: 3 }
        );
        assert_eq!(
            SpaceSpec::parse("Discrete(n=5)"),
            SpaceSpec::Discrete { n: 5 }
        );
    }

    #[test]
    fn unknown_code_is_opaque() {
        let code = "gym.spaces.Tuple((gym.spaces.Discrete(2), gym.spaces.Discrete(3)))";
        assert_eq!(SpaceSpec::parse(code), SpaceSpec::Opaque(code.to_string()));
        assert_eq!(SpaceSpec::parse(""), SpaceSpec::Opaque(String::new()));
        assert!(SpaceSpec::parse("Box(low=0, high=1)").check(&SpaceValue::Box(vec![])).is_ok());
    }

    #[test]
    fn check_layout() {
        let spec = SpaceSpec::boxed(4);
        assert!(spec.check(&SpaceValue::Box(vec![0.0; 4])).is_ok());
        assert!(spec.check(&SpaceValue::Box(vec![0.0; 3])).is_err());
        assert!(spec.check(&SpaceValue::Discrete(1)).is_err());

        let spec = SpaceSpec::Discrete { n: 2 };
        assert!(spec.check(&SpaceValue::Discrete(1)).is_ok());
        assert!(spec.check(&SpaceValue::Discrete(2)).is_err());
    }

    #[test]
    fn proto_conversion_keeps_structure() {
        let value = SpaceValue::Dict(vec![
            ("cbr".to_string(), SpaceValue::Box(vec![0.25, 0.5])),
            (
                "flags".to_string(),
                SpaceValue::Tuple(vec![
                    SpaceValue::MultiBinary(vec![true, false]),
                    SpaceValue::MultiDiscrete(vec![3, 1]),
                    SpaceValue::Discrete(2),
                ]),
            ),
        ]);
        let back = SpaceValue::try_from(proto::Space::from(&value)).unwrap();
        assert_eq!(back, value);
        assert!(back.same_shape(&value));
        assert_eq!(back.len(), 7);
        assert_eq!(back.flatten(), vec![0.25, 0.5, 1.0, 0.0, 3.0, 1.0, 2.0]);
    }

    #[test]
    fn empty_space_is_a_protocol_error() {
        let err = SpaceValue::try_from(proto::Space { value: None }).unwrap_err();
        assert!(matches!(err, EnvError::Protocol(_)));
    }

    #[test]
    fn reward_scalars() {
        assert_eq!(SpaceValue::Box(vec![0.75]).as_scalar(), Some(0.75));
        assert_eq!(SpaceValue::Discrete(3).as_scalar(), Some(3.0));
        assert_eq!(SpaceValue::Box(vec![0.1, 0.2]).as_scalar(), None);
    }
}
