//! Serialization of resampled pixels into a model input buffer.

use crate::bitmap::{blue, green, red};
use crate::tensor::{ElementType, InputTensorSpec, Layout, Normalization};
use common::span_debug;

/// Flat, native-endian input tensor bytes plus the shape they encode.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedInput {
    shape: [usize; 4],
    element_type: ElementType,
    bytes: Vec<u8>,
}

impl PackedInput {
    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Reinterpret the bytes as f32 elements. `None` for uint8 buffers.
    pub fn to_f32_vec(&self) -> Option<Vec<f32>> {
        match self.element_type {
            ElementType::Float32 => Some(
                self.bytes
                    .chunks_exact(4)
                    .map(bytemuck::pod_read_unaligned::<f32>)
                    .collect(),
            ),
            ElementType::Uint8 => None,
        }
    }
}

/// Pack `spec.width * spec.height` ARGB pixels (row-major) into the layout and
/// encoding `spec` declares. Alpha is dropped; channels are written R, G, B.
///
/// `pixels` must hold exactly one entry per destination pixel.
pub fn pack(pixels: &[u32], spec: &InputTensorSpec, normalization: &Normalization) -> PackedInput {
    let _s = span_debug!("pack");

    let spatial = spec.width as usize * spec.height as usize;
    debug_assert_eq!(pixels.len(), spatial, "pixel count must match input tensor");

    let expected_len = spec.byte_len();
    let mut bytes = Vec::with_capacity(expected_len);

    let channel_value = |px: u32, channel: usize| match channel {
        0 => red(px),
        1 => green(px),
        _ => blue(px),
    };

    match spec.layout {
        Layout::Nhwc => {
            for &px in pixels {
                for channel in 0..spec.channels {
                    let value = channel_value(px, channel);
                    write_element(&mut bytes, spec.element_type, normalization, channel, value);
                }
            }
        }
        Layout::Nchw => {
            for channel in 0..spec.channels {
                for &px in pixels {
                    let value = channel_value(px, channel);
                    write_element(&mut bytes, spec.element_type, normalization, channel, value);
                }
            }
        }
    }

    debug_assert_eq!(bytes.len(), expected_len, "packed buffer length");

    tracing::trace!(
        bytes = bytes.len(),
        layout = ?spec.layout,
        element_type = ?spec.element_type,
        "Packed input tensor"
    );

    PackedInput {
        shape: spec.shape(),
        element_type: spec.element_type,
        bytes,
    }
}

#[inline]
fn write_element(
    bytes: &mut Vec<u8>,
    element_type: ElementType,
    normalization: &Normalization,
    channel: usize,
    value: u8,
) {
    match element_type {
        ElementType::Float32 => {
            bytes.extend_from_slice(&normalization.apply(channel, value).to_ne_bytes())
        }
        ElementType::Uint8 => bytes.push(value),
    }
}
