//! The boundary between the Mutation Extractor and the Delivery Loop:
//! the Extractor calls the Publisher's blocking send through here.
//!
//! `cdc-extract` cannot depend on `cdc-producer` (the Delivery Loop lives
//! there, and `cdc-producer` depends on `cdc-extract`), so the call is
//! inverted through this trait: `cdc-producer::DeliveryLoop` implements it,
//! `Extractor` only calls through it. Same capability-interface pattern as
//! `cdc_commitlog::parser::SegmentParser`.

use crate::model::Mutation;

pub trait MutationSink<M> {
    fn send(&mut self, mutation: Mutation<M>);
}
