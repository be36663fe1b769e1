#![allow(missing_docs)]
//! Wire messages exchanged with the simulator.
//!
//! The simulator is the requesting side: it sends a [`Request`] and blocks until
//! the agent answers with a [`Reply`]. An episode is the sequence
//! `init`, `step`, `step`, ..., `shutdown`.
//!
//! The layout follows the `veinsgym` protobuf schema, so the messages are
//! accepted by the simulator's protobuf parser as they are.

/// Continuous values, `repeated double values = 1`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BoxValues {
    #[prost(double, repeated, tag = "1")]
    pub values: ::prost::alloc::vec::Vec<f64>,
}

/// A single categorical value.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DiscreteValue {
    #[prost(uint64, tag = "1")]
    pub value: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MultiDiscreteValues {
    #[prost(uint64, repeated, tag = "1")]
    pub values: ::prost::alloc::vec::Vec<u64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MultiBinaryValues {
    #[prost(bool, repeated, tag = "1")]
    pub values: ::prost::alloc::vec::Vec<bool>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TupleValues {
    #[prost(message, repeated, tag = "1")]
    pub values: ::prost::alloc::vec::Vec<Space>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DictItem {
    #[prost(string, tag = "1")]
    pub key: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "2")]
    pub value: ::core::option::Option<Space>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DictValues {
    #[prost(message, repeated, tag = "1")]
    pub values: ::prost::alloc::vec::Vec<DictItem>,
}

/// A value of a gym space, a tagged union over the space kinds.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Space {
    #[prost(oneof = "space::Value", tags = "1, 2, 3, 4, 5, 6")]
    pub value: ::core::option::Option<space::Value>,
}

pub mod space {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Value {
        #[prost(message, tag = "1")]
        Discrete(super::DiscreteValue),
        #[prost(message, tag = "2")]
        Box(super::BoxValues),
        #[prost(message, tag = "3")]
        MultiDiscrete(super::MultiDiscreteValues),
        #[prost(message, tag = "4")]
        MultiBinary(super::MultiBinaryValues),
        #[prost(message, tag = "5")]
        Tuple(super::TupleValues),
        #[prost(message, tag = "6")]
        Dict(super::DictValues),
    }
}

/// Sent by the simulator once per run, right after it connected.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Init {
    #[prost(string, tag = "1")]
    pub observation_space_code: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub action_space_code: ::prost::alloc::string::String,
}

/// Observation and reward of the last interval; asks for the next action.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StepRequest {
    #[prost(message, optional, tag = "1")]
    pub observation: ::core::option::Option<Space>,
    #[prost(message, optional, tag = "2")]
    pub reward: ::core::option::Option<Space>,
}

/// Sent when the simulation run is over.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Shutdown {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Request {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(oneof = "request::Content", tags = "2, 3, 4")]
    pub content: ::core::option::Option<request::Content>,
}

pub mod request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Content {
        #[prost(message, tag = "2")]
        Shutdown(super::Shutdown),
        #[prost(message, tag = "3")]
        Init(super::Init),
        #[prost(message, tag = "4")]
        Step(super::StepRequest),
    }
}

/// The agent's answer. An empty reply acknowledges `init` and `shutdown`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Reply {
    #[prost(oneof = "reply::Content", tags = "2")]
    pub content: ::core::option::Option<reply::Content>,
}

pub mod reply {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Content {
        #[prost(message, tag = "2")]
        Action(super::Space),
    }
}
