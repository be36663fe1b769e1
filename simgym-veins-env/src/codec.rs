//! Encoding of actions into the simulator's wire format.
//!
//! An [`ActionCodec`] turns an action into the bytes of one [`Reply`] message.
//! Codecs are pure: they hold no state and have no side effect, so a single
//! codec can be shared by several sessions. The session passes the action
//! space announced by the simulator, if any, so a codec can reject actions of
//! the wrong arity instead of sending them.
//!
//! Any closure `Fn(&A, Option<&SpaceSpec>) -> Result<Vec<u8>, EnvError>` is a
//! codec, which is how scenarios with custom encodings plug in.
use crate::{
    act::VeinsAct,
    proto::{reply, Reply},
    space::{SpaceSpec, SpaceValue},
};
use prost::Message;
use simgym_core::EnvError;

/// Converts an action into a serialized message.
pub trait ActionCodec<A>: Send + Sync {
    /// Encodes `act`.
    ///
    /// `space` is the action space of the running scenario, if known.
    /// Fails with [`EnvError::Encoding`] when the action cannot be represented.
    fn encode(&self, act: &A, space: Option<&SpaceSpec>) -> Result<Vec<u8>, EnvError>;
}

impl<A, F> ActionCodec<A> for F
where
    F: Fn(&A, Option<&SpaceSpec>) -> Result<Vec<u8>, EnvError> + Send + Sync,
{
    fn encode(&self, act: &A, space: Option<&SpaceSpec>) -> Result<Vec<u8>, EnvError> {
        self(act, space)
    }
}

/// Wraps [`VeinsAct::to_space`] in a reply.
///
/// A [`BoxAct`](crate::BoxAct) becomes the `box` variant, a
/// [`DiscreteAct`](crate::DiscreteAct) the `discrete` variant. Values must be
/// finite and match the action space; nothing is truncated or padded.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultActionCodec;

impl<A: VeinsAct> ActionCodec<A> for DefaultActionCodec {
    fn encode(&self, act: &A, space: Option<&SpaceSpec>) -> Result<Vec<u8>, EnvError> {
        let value = act.to_space();
        check_finite(&value)?;
        if let Some(space) = space {
            space.check(&value).map_err(EnvError::Encoding)?;
        }
        Ok(encode_reply(&value))
    }
}

fn check_finite(value: &SpaceValue) -> Result<(), EnvError> {
    match value {
        SpaceValue::Box(values) => match values.iter().position(|v| !v.is_finite()) {
            Some(ix) => Err(EnvError::Encoding(format!(
                "value {} at index {} is not a finite number",
                values[ix], ix
            ))),
            None => Ok(()),
        },
        SpaceValue::Tuple(values) => values.iter().try_for_each(check_finite),
        SpaceValue::Dict(items) => items.iter().try_for_each(|(_, v)| check_finite(v)),
        _ => Ok(()),
    }
}

/// Serializes a reply carrying `action`.
pub fn encode_reply(action: &SpaceValue) -> Vec<u8> {
    Reply {
        content: Some(reply::Content::Action(action.into())),
    }
    .encode_to_vec()
}

/// Serializes the empty reply that acknowledges `init` and `shutdown`.
pub fn encode_ack() -> Vec<u8> {
    Reply { content: None }.encode_to_vec()
}

/// Decodes the action of a serialized reply, the way the simulator does.
pub fn decode_action(bytes: &[u8]) -> Result<SpaceValue, EnvError> {
    let reply = Reply::decode(bytes)
        .map_err(|e| EnvError::Protocol(format!("cannot decode reply: {}", e)))?;
    match reply.content {
        Some(reply::Content::Action(space)) => SpaceValue::try_from(space),
        None => Err(EnvError::Protocol("reply without action".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BoxAct, DiscreteAct};
    use std::sync::Arc;

    #[test]
    fn box_action_round_trips_exactly() {
        let act = BoxAct::new(vec![0.15, 0.15, 0.40, 0.40]);
        let bytes = DefaultActionCodec
            .encode(&act, Some(&SpaceSpec::boxed(4)))
            .unwrap();
        assert_eq!(decode_action(&bytes).unwrap(), SpaceValue::Box(act.0));
    }

    #[test]
    fn extreme_values_survive() {
        let values = vec![f64::MAX, f64::MIN_POSITIVE, -0.0, 1e-300];
        let bytes = DefaultActionCodec
            .encode(&BoxAct::new(values.clone()), None)
            .unwrap();
        assert_eq!(decode_action(&bytes).unwrap(), SpaceValue::Box(values));
    }

    #[test]
    fn discrete_action_uses_discrete_variant() {
        let bytes = DefaultActionCodec
            .encode(&DiscreteAct(2), Some(&SpaceSpec::Discrete { n: 3 }))
            .unwrap();
        assert_eq!(decode_action(&bytes).unwrap(), SpaceValue::Discrete(2));
    }

    #[test]
    fn wrong_arity_is_rejected() {
        let err = DefaultActionCodec
            .encode(&BoxAct::new(vec![0.1, 0.2, 0.3]), Some(&SpaceSpec::boxed(4)))
            .unwrap_err();
        assert!(matches!(err, EnvError::Encoding(_)));

        let err = DefaultActionCodec
            .encode(&DiscreteAct(0), Some(&SpaceSpec::boxed(4)))
            .unwrap_err();
        assert!(matches!(err, EnvError::Encoding(_)));

        let err = DefaultActionCodec
            .encode(&DiscreteAct(3), Some(&SpaceSpec::Discrete { n: 3 }))
            .unwrap_err();
        assert!(matches!(err, EnvError::Encoding(_)));
    }

    #[test]
    fn non_finite_values_are_rejected() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = DefaultActionCodec
                .encode(&BoxAct::new(vec![0.0, bad]), None)
                .unwrap_err();
            assert!(matches!(err, EnvError::Encoding(_)));
        }
    }

    #[test]
    fn closures_are_codecs() {
        // Sends only the first value, as a discrete choice.
        let codec: Arc<dyn ActionCodec<BoxAct>> =
            Arc::new(|act: &BoxAct, _: Option<&SpaceSpec>| {
                let choice = act.0.first().copied().unwrap_or_default();
                if choice < 0.0 {
                    return Err(EnvError::Encoding("negative choice".to_string()));
                }
                Ok(encode_reply(&SpaceValue::Discrete(choice as u64)))
            });

        let bytes = codec.encode(&BoxAct::new(vec![2.0, 9.0]), None).unwrap();
        assert_eq!(decode_action(&bytes).unwrap(), SpaceValue::Discrete(2));
        assert!(codec.encode(&BoxAct::new(vec![-1.0]), None).is_err());
    }

    #[test]
    fn ack_carries_no_action() {
        assert!(encode_ack().is_empty());
        assert!(matches!(
            decode_action(&encode_ack()),
            Err(EnvError::Protocol(_))
        ));
    }
}
