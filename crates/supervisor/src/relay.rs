//! Console relay: captured server output, line by line, into a sink.
//!
//! Each captured stream gets a reader task which splits it into lines and pushes them onto one
//! shared FIFO channel. A single forwarder task drains that channel into the [`ConsoleSink`], so
//! lines from one stream reach the sink in the order the server wrote them. Lines from stdout and
//! stderr are interleaved in whatever order the readers got to them.

use std::{fmt, sync::Arc};

use tokio::{
	io::{AsyncBufReadExt, AsyncRead, BufReader},
	sync::mpsc,
	task::JoinHandle,
};
use tracing::{debug, info, trace};

/// Where relayed console lines go.
///
/// Appends are fire-and-forget: there is no backpressure, and the sink must not block.
pub trait ConsoleSink: Send + Sync + 'static {
	/// Record one line of output from the server identified by `server_id`.
	fn append(&self, server_id: &str, line: &str);
}

/// A line of console output, as delivered by a channel sink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsoleLine {
	pub server_id: String,
	pub line: String,
}

impl ConsoleSink for mpsc::UnboundedSender<ConsoleLine> {
	fn append(&self, server_id: &str, line: &str) {
		// receiver gone means nobody is listening anymore, which is fine
		self.send(ConsoleLine {
			server_id: server_id.into(),
			line: line.into(),
		})
		.ok();
	}
}

/// Sink which emits every line as an `info` event on the `palkeeper::console` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl ConsoleSink for TracingSink {
	fn append(&self, server_id: &str, line: &str) {
		info!(target: "palkeeper::console", server = %server_id, "{line}");
	}
}

/// Which output stream a line came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stream {
	Stdout,
	Stderr,
}

impl fmt::Display for Stream {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Stdout => "stdout",
			Self::Stderr => "stderr",
		})
	}
}

/// The running relay for one server process.
///
/// Dropping it does not stop the relay: the tasks end on their own once the process closes its
/// streams.
#[derive(Debug)]
pub struct ConsoleRelay {
	tasks: Vec<JoinHandle<()>>,
}

impl ConsoleRelay {
	/// Start relaying. Must be called from within a Tokio runtime.
	pub(crate) fn attach<O, E>(
		server_id: &str,
		stdout: Option<O>,
		stderr: Option<E>,
		sink: Arc<dyn ConsoleSink>,
	) -> Self
	where
		O: AsyncRead + Unpin + Send + 'static,
		E: AsyncRead + Unpin + Send + 'static,
	{
		let (lines_s, lines_r) = mpsc::unbounded_channel();
		let mut tasks = Vec::with_capacity(3);

		if let Some(stdout) = stdout {
			tasks.push(tokio::spawn(read_lines(Stream::Stdout, stdout, lines_s.clone())));
		}

		if let Some(stderr) = stderr {
			tasks.push(tokio::spawn(read_lines(Stream::Stderr, stderr, lines_s.clone())));
		}

		// the forwarder ends once every reader has dropped its sender
		drop(lines_s);

		let server_id = server_id.to_owned();
		tasks.push(tokio::spawn(forward(server_id, lines_r, sink)));

		Self { tasks }
	}

	/// If both streams have closed and every line has been delivered.
	#[must_use]
	pub fn is_finished(&self) -> bool {
		self.tasks.iter().all(JoinHandle::is_finished)
	}

	/// Wait until both streams have closed and every line has been delivered.
	///
	/// Cancel-safe: tasks are only let go of once they've ended.
	pub async fn finished(&mut self) {
		while let Some(task) = self.tasks.first_mut() {
			if let Err(err) = task.await {
				debug!(%err, "console relay task ended abnormally");
			}
			self.tasks.remove(0);
		}
	}
}

async fn read_lines<R>(stream: Stream, reader: R, lines: mpsc::UnboundedSender<(Stream, String)>)
where
	R: AsyncRead + Unpin,
{
	let mut reader = BufReader::new(reader);
	let mut buf = Vec::new();

	loop {
		buf.clear();
		match reader.read_until(b'\n', &mut buf).await {
			Ok(0) => break,
			Ok(_) => {
				if buf.last() == Some(&b'\n') {
					buf.pop();
				}
				if buf.last() == Some(&b'\r') {
					buf.pop();
				}

				let line = String::from_utf8_lossy(&buf).into_owned();
				if lines.send((stream, line)).is_err() {
					break;
				}
			}
			Err(err) => {
				debug!(%stream, %err, "console stream read failed, stopping relay for it");
				break;
			}
		}
	}

	trace!(%stream, "console stream closed");
}

async fn forward(
	server_id: String,
	mut lines: mpsc::UnboundedReceiver<(Stream, String)>,
	sink: Arc<dyn ConsoleSink>,
) {
	while let Some((stream, line)) = lines.recv().await {
		trace!(server=%server_id, %stream, "relaying console line");
		sink.append(&server_id, &line);
	}
}
