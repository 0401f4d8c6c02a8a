//! Requests: the phase markers that drive one pass of negotiation.
//!
//! A `Request` says which phase is running, in which direction the executive
//! forwards it, and whether the local algorithm runs before or after that
//! forwarding. Anything else a request needs travels in its `extras` bag.

use crate::pipeline::information::{keys, InfoKey, Information};
use serde::Serialize;

/// The phase a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RequestKind {
    DataObject,
    Information,
    UpdateExtent,
    Data,
    TimeDependentInformation,
    /// Algorithm-defined request, dispatched to `request_default`.
    Generic(&'static str),
}

/// Where an executive forwards a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ForwardDirection {
    Upstream,
    Downstream,
    None,
}

/// When the local algorithm runs relative to forwarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AlgorithmTiming {
    BeforeForward,
    AfterForward,
    Both,
    Neither,
}

impl AlgorithmTiming {
    pub fn runs_before(self) -> bool {
        matches!(self, AlgorithmTiming::BeforeForward | AlgorithmTiming::Both)
    }

    pub fn runs_after(self) -> bool {
        matches!(self, AlgorithmTiming::AfterForward | AlgorithmTiming::Both)
    }
}

/// Which side of upstream forwarding `Algorithm::modify_request` is called on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifyWhen {
    Before,
    After,
}

/// Keys an information request copies from inputs to outputs.
pub const INFORMATION_KEYS: &[InfoKey] = &[keys::WHOLE_EXTENT, keys::TIME_STEPS];

/// Keys an update-extent request copies from an output to every input.
pub const UPDATE_EXTENT_KEYS: &[InfoKey] = &[
    keys::UPDATE_EXTENT,
    keys::UPDATE_PIECE_NUMBER,
    keys::UPDATE_NUMBER_OF_PIECES,
    keys::UPDATE_NUMBER_OF_GHOST_LEVELS,
    keys::UPDATE_TIME_STEP,
    keys::UPDATE_COMPOSITE_INDICES,
];

/// A mutable request travelling through the executive graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub kind: RequestKind,
    pub direction: ForwardDirection,
    pub timing: AlgorithmTiming,
    /// Output port of the executive currently handling the request.
    pub from_output_port: Option<usize>,
    keys_to_copy: Vec<InfoKey>,
    extras: Information,
}

impl Request {
    pub fn new(kind: RequestKind, direction: ForwardDirection, timing: AlgorithmTiming) -> Self {
        Self {
            kind,
            direction,
            timing,
            from_output_port: None,
            keys_to_copy: Vec::new(),
            extras: Information::new(),
        }
    }

    /// Standard request for `kind`: forwarded upstream with its default
    /// timing and key list.
    pub fn for_kind(kind: RequestKind) -> Self {
        let mut request = Self::new(kind, ForwardDirection::Upstream, AlgorithmTiming::AfterForward);
        request.apply_defaults();
        request
    }

    pub fn data_object() -> Self {
        Self::for_kind(RequestKind::DataObject)
    }

    pub fn information() -> Self {
        Self::for_kind(RequestKind::Information)
    }

    pub fn update_extent() -> Self {
        Self::for_kind(RequestKind::UpdateExtent)
    }

    pub fn data() -> Self {
        Self::for_kind(RequestKind::Data)
    }

    pub fn time_dependent_information() -> Self {
        Self::for_kind(RequestKind::TimeDependentInformation)
    }

    pub fn generic(name: &'static str) -> Self {
        Self::for_kind(RequestKind::Generic(name))
    }

    /// Turn this request into the standard request for `kind`, keeping
    /// `from_output_port` and the extras bag.
    pub fn retarget(&mut self, kind: RequestKind) {
        self.kind = kind;
        self.direction = ForwardDirection::Upstream;
        self.apply_defaults();
    }

    fn apply_defaults(&mut self) {
        match self.kind {
            RequestKind::UpdateExtent => {
                self.timing = AlgorithmTiming::BeforeForward;
                self.keys_to_copy = UPDATE_EXTENT_KEYS.to_vec();
            }
            RequestKind::Information => {
                self.timing = AlgorithmTiming::AfterForward;
                self.keys_to_copy = INFORMATION_KEYS.to_vec();
            }
            _ => {
                self.timing = AlgorithmTiming::AfterForward;
                self.keys_to_copy.clear();
            }
        }
    }

    pub fn keys_to_copy(&self) -> &[InfoKey] {
        &self.keys_to_copy
    }

    pub fn add_key_to_copy(&mut self, key: InfoKey) {
        if !self.keys_to_copy.contains(&key) {
            self.keys_to_copy.push(key);
        }
    }

    pub fn set_keys_to_copy(&mut self, keys: Vec<InfoKey>) {
        self.keys_to_copy = keys;
    }

    pub fn extras(&self) -> &Information {
        &self.extras
    }

    pub fn extras_mut(&mut self) -> &mut Information {
        &mut self.extras
    }

    /// Output port to read defaults from; port 0 when unset.
    pub fn output_port_or_default(&self) -> usize {
        self.from_output_port.unwrap_or(0)
    }
}
