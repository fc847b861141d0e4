use std::f32::consts::FRAC_PI_2;

// -------------------------------------------------------------------------------------------------

/// Set all samples in the given buffer to zero.
#[inline]
pub fn clear_buffer(buffer: &mut [f32]) {
    buffer.iter_mut().for_each(|s| *s = 0.0);
}

/// Multiply all samples in the given buffer with `gain`.
#[inline]
pub fn scale_buffer(buffer: &mut [f32], gain: f32) {
    if gain != 1.0 {
        buffer.iter_mut().for_each(|s| *s *= gain);
    }
}

/// Add `source` samples into `destination`. Both buffers must have the same length.
#[inline]
pub fn add_buffers(destination: &mut [f32], source: &[f32]) {
    debug_assert_eq!(destination.len(), source.len());
    for (d, s) in destination.iter_mut().zip(source) {
        *d += *s;
    }
}

// -------------------------------------------------------------------------------------------------

/// Apply a half cosine fade-out envelope over the whole interleaved buffer: the first
/// frame stays untouched, the last frame is almost silent.
pub fn fade_out_buffer(buffer: &mut [f32], channel_count: usize) {
    debug_assert!(channel_count > 0);
    let frame_count = buffer.len() / channel_count;
    if frame_count == 0 {
        return;
    }
    for (frame_index, frame) in buffer.chunks_exact_mut(channel_count).enumerate() {
        let gain = (frame_index as f32 / frame_count as f32 * FRAC_PI_2).cos();
        frame.iter_mut().for_each(|s| *s *= gain);
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixing() {
        let mut destination = vec![1.0, 2.0, 3.0, 4.0];
        add_buffers(&mut destination, &[1.0, 1.0, 1.0, 1.0]);
        assert_eq!(destination, vec![2.0, 3.0, 4.0, 5.0]);

        scale_buffer(&mut destination, 0.5);
        assert_eq!(destination, vec![1.0, 1.5, 2.0, 2.5]);

        clear_buffer(&mut destination);
        assert!(destination.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn fade_out() {
        let mut buffer = vec![1.0; 8 * 2];
        fade_out_buffer(&mut buffer, 2);
        // first frame is untouched
        assert_eq!(buffer[0], 1.0);
        assert_eq!(buffer[1], 1.0);
        // gains decrease monotonically
        for frame in 1..8 {
            assert!(buffer[frame * 2] < buffer[(frame - 1) * 2]);
            assert_eq!(buffer[frame * 2], buffer[frame * 2 + 1]);
        }
        // last frame is nearly silent
        assert!(buffer[14] < 0.2);
    }
}
