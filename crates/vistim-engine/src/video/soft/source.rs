//! Frame producers behind the soft source elements.
//!
//! Every source hands out tightly packed RGBA8 frames, top row first. Encoded
//! payloads (files, network) are decoded with the `image` crate.

use std::fs;
use std::io::{self, Cursor, Read};
use std::net::{TcpStream, ToSocketAddrs, UdpSocket};
use std::path::Path;
use std::time::Duration;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, ImageFormat, RgbaImage};

use crate::video::{BackendError, PipelineState};

use super::element::{ElementKind, Pattern, TestSrcProps};

/// Poll period of network reads, bounding how long a stop request waits.
const NET_POLL: Duration = Duration::from_millis(100);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Upper bound on one length-prefixed TCP payload.
const MAX_TCP_PAYLOAD: usize = 64 << 20;
const MAX_DATAGRAM: usize = 65_536;
/// Frame delay used when a GIF frame declares none.
const DEFAULT_GIF_DELAY: Duration = Duration::from_millis(100);

/// A decoded frame, RGBA8 with `width * 4` bytes per row.
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl From<RgbaImage> for RawFrame {
    fn from(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self { width, height, data: image.into_raw() }
    }
}

/// Outcome of one pull on a source.
pub enum Pull {
    /// A frame, to be shown for `duration`.
    Frame { frame: RawFrame, duration: Duration },
    /// Nothing available yet; pull again.
    Pending,
    Eos,
}

pub enum Source {
    Test(TestSource),
    Clip(ClipSource),
    Tcp(TcpSource),
    Udp(UdpSource),
}

impl Source {
    /// Opens the resources behind a source element.
    pub fn open(kind: &ElementKind) -> Result<Self, BackendError> {
        match kind {
            ElementKind::TestSrc(props) => Ok(Source::Test(TestSource::new(props.clone()))),
            ElementKind::FileSrc { location: Some(path) } => ClipSource::open(path).map(Source::Clip),
            ElementKind::FileSrc { location: None } => Err(not_ready("filesrc has no `location`")),
            ElementKind::TcpClientSrc { host, port } => TcpSource::connect(host, *port).map(Source::Tcp),
            ElementKind::UdpSrc { port } => UdpSource::bind(*port).map(Source::Udp),
            other => Err(not_ready(format!("{other:?} is not a source"))),
        }
    }

    pub fn pull(&mut self) -> Result<Pull, String> {
        match self {
            Source::Test(s) => Ok(s.pull()),
            Source::Clip(s) => Ok(s.pull()),
            Source::Tcp(s) => s.pull(),
            Source::Udp(s) => Ok(s.pull()),
        }
    }

    /// Live sources produce data on their own clock and cannot preroll.
    pub fn is_live(&self) -> bool {
        matches!(self, Source::Tcp(_) | Source::Udp(_))
    }

    pub fn seek(&mut self, position: Duration) -> Result<(), BackendError> {
        match self {
            Source::Test(s) => {
                s.seek(position);
                Ok(())
            }
            Source::Clip(s) => {
                s.seek(position);
                Ok(())
            }
            Source::Tcp(_) | Source::Udp(_) => {
                Err(BackendError::Seek("network sources cannot seek".into()))
            }
        }
    }

    /// Back to the first frame, as after a fresh open.
    pub fn rewind(&mut self) {
        match self {
            Source::Test(s) => s.seek(Duration::ZERO),
            Source::Clip(s) => s.seek(Duration::ZERO),
            Source::Tcp(_) | Source::Udp(_) => {}
        }
    }
}

fn not_ready(reason: impl Into<String>) -> BackendError {
    BackendError::StateChange {
        target: PipelineState::Ready,
        reason: reason.into(),
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

fn decode_payload(bytes: &[u8]) -> Result<RawFrame, image::ImageError> {
    Ok(image::load_from_memory(bytes)?.to_rgba8().into())
}

// ── test pattern ──────────────────────────────────────────────────────────

/// 75% color bars: white, yellow, cyan, green, magenta, red, blue.
const BARS: [[u8; 3]; 7] = [
    [191, 191, 191],
    [191, 191, 0],
    [0, 191, 191],
    [0, 191, 0],
    [191, 0, 191],
    [191, 0, 0],
    [0, 0, 191],
];

const CHECKER_SIZE: u32 = 8;

pub struct TestSource {
    props: TestSrcProps,
    index: u64,
}

impl TestSource {
    fn new(props: TestSrcProps) -> Self {
        Self { props, index: 0 }
    }

    fn pull(&mut self) -> Pull {
        if self.props.num_buffers.is_some_and(|n| self.index >= n) {
            return Pull::Eos;
        }
        let frame = render_pattern(self.props.pattern, self.props.width, self.props.height, self.index);
        self.index += 1;
        Pull::Frame { frame, duration: self.props.frame_duration() }
    }

    fn seek(&mut self, position: Duration) {
        let frame = self.props.frame_duration().as_nanos().max(1);
        self.index = (position.as_nanos() / frame) as u64;
    }
}

pub fn render_pattern(pattern: Pattern, width: u32, height: u32, index: u64) -> RawFrame {
    let mut data = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            let rgb = match pattern {
                Pattern::Bars => BARS[(x as usize * BARS.len()) / width as usize],
                Pattern::Checkers => {
                    if ((x / CHECKER_SIZE) + (y / CHECKER_SIZE)) % 2 == 0 {
                        [0, 0, 0]
                    } else {
                        [255, 255, 255]
                    }
                }
                Pattern::Gradient => {
                    let shifted = (u64::from(x) + index) % u64::from(width);
                    let v = (shifted * 255 / u64::from(width.max(2) - 1).max(1)).min(255) as u8;
                    [v, v, v]
                }
            };
            data.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }
    }
    RawFrame { width, height, data }
}

// ── file ──────────────────────────────────────────────────────────────────

struct ClipFrame {
    image: RgbaImage,
    start: Duration,
    duration: Duration,
}

/// A file decoded up front: every frame of an animation, or one still.
pub struct ClipSource {
    frames: Vec<ClipFrame>,
    index: usize,
}

impl ClipSource {
    fn open(path: &Path) -> Result<Self, BackendError> {
        let bytes = fs::read(path).map_err(|source| BackendError::Io {
            context: format!("cannot open `{}`", path.display()),
            source,
        })?;
        let format = image::guess_format(&bytes)
            .map_err(|_| not_ready(format!("cannot determine the stream type of `{}`", path.display())))?;
        let decode_failed = |e: image::ImageError| not_ready(format!("cannot decode `{}`: {e}", path.display()));

        let frames = if format == ImageFormat::Gif {
            let decoder = GifDecoder::new(Cursor::new(bytes)).map_err(decode_failed)?;
            let mut start = Duration::ZERO;
            let mut frames = Vec::new();
            for frame in decoder.into_frames() {
                let frame = frame.map_err(decode_failed)?;
                let (num, den) = frame.delay().numer_denom_ms();
                let declared = Duration::from_millis(u64::from(num)) / den.max(1);
                let duration = if declared.is_zero() { DEFAULT_GIF_DELAY } else { declared };
                frames.push(ClipFrame { image: frame.into_buffer(), start, duration });
                start += duration;
            }
            frames
        } else {
            let image = image::load_from_memory_with_format(&bytes, format).map_err(decode_failed)?;
            vec![ClipFrame { image: image.to_rgba8(), start: Duration::ZERO, duration: Duration::ZERO }]
        };

        if frames.is_empty() {
            return Err(not_ready(format!("`{}` contains no frames", path.display())));
        }
        log::debug!("decoded `{}`: {:?}, {} frame(s)", path.display(), format, frames.len());
        Ok(Self { frames, index: 0 })
    }

    fn pull(&mut self) -> Pull {
        let Some(frame) = self.frames.get(self.index) else {
            return Pull::Eos;
        };
        self.index += 1;
        Pull::Frame {
            frame: frame.image.clone().into(),
            duration: frame.duration,
        }
    }

    /// Jumps to the frame showing at `position`; past the end means EOS.
    fn seek(&mut self, position: Duration) {
        self.index = self
            .frames
            .iter()
            .position(|f| position < f.start + f.duration.max(Duration::from_nanos(1)))
            .unwrap_or(self.frames.len());
    }
}

// ── network ───────────────────────────────────────────────────────────────

/// Reads `u32` big-endian length-prefixed encoded images.
pub struct TcpSource {
    stream: TcpStream,
    pending: Vec<u8>,
}

impl TcpSource {
    fn connect(host: &str, port: u16) -> Result<Self, BackendError> {
        let io_err = |source| BackendError::Io {
            context: format!("cannot connect to {host}:{port}"),
            source,
        };
        let addrs: Vec<_> = (host, port).to_socket_addrs().map_err(io_err)?.collect();
        let mut last = io::Error::new(io::ErrorKind::NotFound, "host resolved to no address");
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(NET_POLL)).map_err(io_err)?;
                    log::debug!("connected to {addr}");
                    return Ok(Self { stream, pending: Vec::new() });
                }
                Err(e) => last = e,
            }
        }
        Err(io_err(last))
    }

    fn take_message(&mut self) -> Option<Result<Vec<u8>, String>> {
        let header: [u8; 4] = self.pending.get(..4)?.try_into().ok()?;
        let len = u32::from_be_bytes(header) as usize;
        if len > MAX_TCP_PAYLOAD {
            return Some(Err(format!("payload of {len} bytes exceeds the limit")));
        }
        if self.pending.len() < 4 + len {
            return None;
        }
        let message = self.pending[4..4 + len].to_vec();
        self.pending.drain(..4 + len);
        Some(Ok(message))
    }

    fn pull(&mut self) -> Result<Pull, String> {
        let mut chunk = [0u8; 16 * 1024];
        loop {
            if let Some(message) = self.take_message() {
                let frame = decode_payload(&message?).map_err(|e| format!("cannot decode payload: {e}"))?;
                return Ok(Pull::Frame { frame, duration: Duration::ZERO });
            }
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    if !self.pending.is_empty() {
                        log::warn!("connection closed inside a payload ({} bytes dropped)", self.pending.len());
                    }
                    return Ok(Pull::Eos);
                }
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(e) if is_timeout(&e) => return Ok(Pull::Pending),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(format!("read failed: {e}")),
            }
        }
    }
}

/// One encoded image per datagram. Undecodable datagrams are skipped.
pub struct UdpSource {
    socket: UdpSocket,
    buf: Vec<u8>,
}

impl UdpSource {
    fn bind(port: u16) -> Result<Self, BackendError> {
        let io_err = |source| BackendError::Io {
            context: format!("cannot bind UDP port {port}"),
            source,
        };
        let socket = UdpSocket::bind(("0.0.0.0", port)).map_err(io_err)?;
        socket.set_read_timeout(Some(NET_POLL)).map_err(io_err)?;
        Ok(Self { socket, buf: vec![0u8; MAX_DATAGRAM] })
    }

    fn pull(&mut self) -> Pull {
        match self.socket.recv_from(&mut self.buf) {
            Ok((n, from)) => match decode_payload(&self.buf[..n]) {
                Ok(frame) => Pull::Frame { frame, duration: Duration::ZERO },
                Err(e) => {
                    log::warn!("dropping undecodable datagram from {from}: {e}");
                    Pull::Pending
                }
            },
            Err(e) if is_timeout(&e) || e.kind() == io::ErrorKind::Interrupted => Pull::Pending,
            Err(e) => {
                log::warn!("UDP receive failed: {e}");
                Pull::Pending
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bars_cover_width_in_order() {
        let frame = render_pattern(Pattern::Bars, 14, 1, 0);
        assert_eq!(&frame.data[0..3], &BARS[0]);
        assert_eq!(&frame.data[13 * 4..13 * 4 + 3], &BARS[6]);
        assert!(frame.data.chunks(4).all(|p| p[3] == 255));
    }

    #[test]
    fn checkers_alternate_every_cell() {
        let frame = render_pattern(Pattern::Checkers, 16, 1, 0);
        assert_eq!(frame.data[0], 0);
        assert_eq!(frame.data[8 * 4], 255);
    }

    #[test]
    fn gradient_scrolls_with_frame_index() {
        let a = render_pattern(Pattern::Gradient, 8, 1, 0);
        let b = render_pattern(Pattern::Gradient, 8, 1, 1);
        assert_eq!(a.data[4], b.data[0]);
    }

    #[test]
    fn test_source_stops_after_buffer_count() {
        let props = TestSrcProps { width: 2, height: 2, num_buffers: Some(2), ..TestSrcProps::default() };
        let mut source = TestSource::new(props);
        assert!(matches!(source.pull(), Pull::Frame { .. }));
        assert!(matches!(source.pull(), Pull::Frame { .. }));
        assert!(matches!(source.pull(), Pull::Eos));
    }

    #[test]
    fn test_source_seeks_by_frame_duration() {
        let props = TestSrcProps { framerate: 10, ..TestSrcProps::default() };
        let mut source = TestSource::new(props);
        source.seek(Duration::from_millis(1050));
        assert_eq!(source.index, 10);
    }

    #[test]
    fn missing_file_fails_to_open() {
        let kind = ElementKind::FileSrc { location: Some("/nonexistent/vistim/clip.gif".into()) };
        assert!(matches!(Source::open(&kind), Err(BackendError::Io { .. })));
    }

    #[test]
    fn unknown_bytes_fail_type_detection() {
        let path = std::env::temp_dir().join(format!("vistim-garbage-{}.bin", std::process::id()));
        fs::write(&path, b"definitely not an image").unwrap();
        let result = Source::open(&ElementKind::FileSrc { location: Some(path.clone()) });
        let _ = fs::remove_file(&path);
        assert!(matches!(result, Err(BackendError::StateChange { .. })));
    }

    #[test]
    fn clip_seek_lands_on_covering_frame() {
        let frame = |start_ms, len_ms| ClipFrame {
            image: RgbaImage::new(1, 1),
            start: Duration::from_millis(start_ms),
            duration: Duration::from_millis(len_ms),
        };
        let mut clip = ClipSource { frames: vec![frame(0, 100), frame(100, 100), frame(200, 100)], index: 0 };
        clip.seek(Duration::from_millis(150));
        assert_eq!(clip.index, 1);
        clip.seek(Duration::from_secs(5));
        assert!(matches!(clip.pull(), Pull::Eos));
    }
}
