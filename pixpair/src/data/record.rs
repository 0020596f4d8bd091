//! Aggregation of decoded per-plane cluster records into frames.
//!
//! The decoder upstream emits one record per cluster, tagged with the
//! readout event it belongs to. Records sharing an event id are merged into
//! one frame here, across planes, in first-seen event order. This layer is
//! also where malformed records are rejected; the pairing engine itself
//! assumes well-typed numeric inputs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::frame::{Cluster, Frame};
use pixcore::geometry::plane::PlaneId;

/// Clusters below this pixel count are most likely gammas.
pub const SMALL_CLUSTER_PIXELS: u32 = 5;

/// One decoded cluster as handed over by the upstream decoder.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterRecord {
    pub event_id: u64,
    /// Detector channel, 0..=4.
    pub channel: u8,
    pub x: f64,
    pub y: f64,
    pub polar: f64,
    pub azimuth: f64,
    /// Mean energy deposition (LET).
    pub let_mean: f64,
    /// Number of pixels in the cluster.
    pub size: u32,
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("unknown detector channel {channel} in event {event_id}")]
    UnknownChannel { event_id: u64, channel: u8 },
    #[error("non-finite {field} in event {event_id}")]
    NonFinite { event_id: u64, field: &'static str },
}

impl ClusterRecord {
    pub fn validate(&self) -> Result<(), RecordError> {
        if PlaneId::from_channel(self.channel).is_none() {
            return Err(RecordError::UnknownChannel {
                event_id: self.event_id,
                channel: self.channel,
            });
        }
        for (field, value) in [
            ("x", self.x),
            ("y", self.y),
            ("polar", self.polar),
            ("azimuth", self.azimuth),
            ("let_mean", self.let_mean),
        ] {
            if !value.is_finite() {
                return Err(RecordError::NonFinite {
                    event_id: self.event_id,
                    field,
                });
            }
        }
        Ok(())
    }

    /// Small clusters are almost certainly gammas, large ones almost never.
    pub fn gamma_likelihood(&self) -> f64 {
        if self.size < SMALL_CLUSTER_PIXELS {
            0.99
        } else {
            0.01
        }
    }
}

/// Merges records into one frame per event id, preserving first-seen order.
///
/// Local cluster ids are assigned densely per frame in record order. Any
/// malformed record fails the whole batch; partial frames never reach the
/// engine.
pub fn assemble_frames(records: &[ClusterRecord]) -> Result<Vec<Frame>, RecordError> {
    let mut order: Vec<u64> = Vec::new();
    let mut by_event: HashMap<u64, Vec<Cluster>> = HashMap::new();

    for record in records {
        record.validate()?;
        let plane = PlaneId::from_channel(record.channel).ok_or(RecordError::UnknownChannel {
            event_id: record.event_id,
            channel: record.channel,
        })?;
        let cluster = Cluster::new(
            plane,
            record.x,
            record.y,
            record.polar,
            record.azimuth,
            record.let_mean,
            record.gamma_likelihood(),
        );
        if !by_event.contains_key(&record.event_id) {
            order.push(record.event_id);
        }
        by_event.entry(record.event_id).or_default().push(cluster);
    }

    let mut frames = Vec::with_capacity(order.len());
    for event_id in order {
        if let Some(clusters) = by_event.remove(&event_id) {
            frames.push(Frame::new(event_id, clusters));
        }
    }
    Ok(frames)
}
