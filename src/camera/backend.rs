use crate::camera::error::Result;
use crate::camera::types::RawFrame;

/// A source of live camera frames.
///
/// Implementations own the device session and the frame buffers. Each frame
/// is lent to `sink` for the duration of the call only, so the pipeline can
/// never retain it after the source recycles the buffer.
pub trait CaptureSource: Send {
    /// Capture dimensions `(width, height)`.
    fn dimensions(&self) -> (u32, u32);

    /// Block until the next frame is available and hand it to `sink`.
    ///
    /// Returns `Ok(false)` once the source has no more frames.
    fn next_frame(&mut self, sink: &mut dyn FnMut(&RawFrame<'_>)) -> Result<bool>;

    /// Release the device. Called once when the session stops.
    fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::error::CaptureError;
    use crate::camera::types::Plane;

    /// Mock source that lends a fixed number of 2x2 frames.
    struct MockSource {
        remaining: u32,
        y: Vec<u8>,
        u: Vec<u8>,
        v: Vec<u8>,
        fail: bool,
    }

    impl MockSource {
        fn new(remaining: u32) -> Self {
            Self {
                remaining,
                y: vec![10, 20, 30, 40],
                u: vec![1],
                v: vec![2],
                fail: false,
            }
        }
    }

    impl CaptureSource for MockSource {
        fn dimensions(&self) -> (u32, u32) {
            (2, 2)
        }

        fn next_frame(&mut self, sink: &mut dyn FnMut(&RawFrame<'_>)) -> Result<bool> {
            if self.fail {
                return Err(CaptureError::Busy("mock".to_string()));
            }
            if self.remaining == 0 {
                return Ok(false);
            }
            self.remaining -= 1;
            let planes = [
                Plane::new(&self.y, 2, 1),
                Plane::new(&self.u, 1, 1),
                Plane::new(&self.v, 1, 1),
            ];
            sink(&RawFrame::planar(2, 2, &planes));
            Ok(true)
        }
    }

    #[test]
    fn mock_source_lends_frames_until_exhausted() {
        let mut source = MockSource::new(2);
        let mut seen = 0;
        while source
            .next_frame(&mut |frame| {
                assert_eq!(frame.planes.len(), 3);
                seen += 1;
            })
            .unwrap()
        {}
        assert_eq!(seen, 2);
    }

    #[test]
    fn mock_source_reports_busy_device() {
        let mut source = MockSource::new(1);
        source.fail = true;
        let result = source.next_frame(&mut |_| {});
        assert!(matches!(result, Err(CaptureError::Busy(_))));
    }

    #[test]
    fn trait_object_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Box<dyn CaptureSource>>();
    }
}
