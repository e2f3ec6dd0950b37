use bytes::BytesMut;

/// One decoded server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub name: String,
    pub data: String,
    pub id: Option<String>,
}

/// Incremental decoder for a `text/event-stream` body.
///
/// Raw body chunks go in through `feed`, complete events come out of
/// `next_event`. Follows the EventSource wire rules: `event`/`data`/`id`
/// field lines accumulate until a blank line dispatches them, multiple
/// `data` lines join with newlines, lines starting with `:` are comments
/// (the backend sends `: ping` keep-alives), unknown fields are ignored,
/// and a dispatched event without data is discarded. The last seen event
/// id is sticky across events so reconnects can resume from it.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: BytesMut,
    name: String,
    data: String,
    last_id: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Id of the most recently id-tagged event, for `Last-Event-ID` replay.
    pub fn last_id(&self) -> Option<&str> {
        self.last_id.as_deref()
    }

    /// Drains buffered lines until an event dispatches or input runs out.
    /// A trailing partial line stays buffered for the next `feed`.
    pub fn next_event(&mut self) -> Option<SseEvent> {
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let bytes = self.buf.split_to(pos + 1);
            let line = String::from_utf8_lossy(&bytes[..bytes.len() - 1]);
            if let Some(event) = self.process_line(&line) {
                return Some(event);
            }
        }
        None
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.name = value.to_string(),
            "data" => {
                if !self.data.is_empty() {
                    self.data.push('\n');
                }
                self.data.push_str(value);
            }
            // a NUL poisons the id field per the EventSource rules
            "id" if !value.contains('\0') => self.last_id = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let name = std::mem::take(&mut self.name);
        let data = std::mem::take(&mut self.data);

        if data.is_empty() {
            return None;
        }

        Some(SseEvent {
            name: if name.is_empty() {
                "message".to_string()
            } else {
                name
            },
            data,
            id: self.last_id.clone(),
        })
    }
}
