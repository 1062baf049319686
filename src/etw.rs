//! Process-start notifications from the Microsoft-Windows-Kernel-Process
//! ETW provider.
use ferrisetw::parser::Parser;
use ferrisetw::provider::Provider;
use ferrisetw::trace::{TraceTrait, UserTrace};
use ferrisetw::{EventRecord, SchemaLocator};
use tracing::{debug, error, trace};

use crate::bridge::{ProcessStartEvent, ProcessStartSink, ProcessStartSource};
use crate::error::StartupError;

const KERNEL_PROCESS_PROVIDER: &str = "22fb2cd6-0e7b-422b-a0c7-2fad1fd0e716";
/// `WINEVENT_KEYWORD_PROCESS`
const KEYWORD_PROCESS: u64 = 0x10;
const EVENT_PROCESS_START: u16 = 1;

/// Owns the running trace session; dropping it stops the session.
#[derive(Default)]
pub struct EtwProcessStartSource {
    trace: Option<UserTrace>,
}

impl EtwProcessStartSource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn on_event(sink: &ProcessStartSink, record: &EventRecord, schema_locator: &SchemaLocator) {
    if record.event_id() != EVENT_PROCESS_START {
        return;
    }
    let schema = match schema_locator.event_schema(record) {
        Ok(schema) => schema,
        Err(e) => {
            trace!(error = ?e, "no schema for kernel process event");
            return;
        }
    };
    let parser = Parser::create(record, &schema);
    let Ok(pid) = parser.try_parse::<u32>("ProcessID") else {
        return;
    };
    let parent_pid = parser.try_parse::<u32>("ParentProcessID").ok();
    let image_name: String = parser.try_parse("ImageName").unwrap_or_default();

    sink.indicate(ProcessStartEvent::new(pid, parent_pid, &image_name));
}

impl ProcessStartSource for EtwProcessStartSource {
    fn subscribe(&mut self, sink: ProcessStartSink) -> Result<(), StartupError> {
        let process_name = sink.process_name().to_string();
        let provider = Provider::by_guid(KERNEL_PROCESS_PROVIDER)
            .any(KEYWORD_PROCESS)
            .add_callback(move |record: &EventRecord, schema_locator: &SchemaLocator| {
                on_event(&sink, record, schema_locator)
            })
            .build();

        // A random suffix keeps a session leaked by a crashed run from
        // blocking this one with "AlreadyExist".
        let trace_name = format!("SpotifyTaskbarFix_{}", rand::random::<u32>());
        let (user_trace, handle) = UserTrace::new()
            .named(trace_name.clone())
            .enable(provider)
            .start()
            .map_err(|e| StartupError::Subscription {
                reason: format!("{:?}", e),
            })?;

        std::thread::Builder::new()
            .name("etw-process-start".to_string())
            .spawn(move || {
                let status = <UserTrace as TraceTrait>::process_from_handle(handle);
                if let Err(e) = status {
                    error!(error = ?e, "process start trace stopped");
                }
            })
            .map_err(|e| StartupError::Subscription {
                reason: e.to_string(),
            })?;

        debug!(trace = %trace_name, process = %process_name, "subscribed to process starts");
        self.trace = Some(user_trace);
        Ok(())
    }
}
