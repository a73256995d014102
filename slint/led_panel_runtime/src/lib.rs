pub mod color;
pub mod command;
pub mod config;
pub mod listener;
pub mod poller;
pub mod protocol;
pub mod sse;
pub mod sync;
pub mod transport;

use crate::command::{Command, Outbound, dispatch_loop};
use crate::config::Config;
use crate::listener::StreamListener;
use crate::poller::UserCountPoller;
use crate::protocol::MAX_BRIGHTNESS;
use crate::transport::{HttpTransport, Transport};
use slint::ComponentHandle;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

pub use crate::color::{Rgb, parse_hex_color};
pub use crate::protocol::{DeviceState, PowerState, StreamMessage};
pub use crate::sync::PanelView;
pub use tracing;

pub trait HostBindings {
    type Ui: ComponentHandle + PanelView + 'static;

    fn new_ui() -> Result<Self::Ui, slint::PlatformError>;

    fn bind_power<F>(ui: &Self::Ui, handler: F)
    where
        F: Fn(PowerState) + 'static;

    fn bind_brightness_commit<F>(ui: &Self::Ui, handler: F)
    where
        F: Fn(f32) + 'static;

    fn bind_color_commit<F>(ui: &Self::Ui, handler: F)
    where
        F: Fn(String) + 'static;

    fn bind_clear_log<F>(ui: &Self::Ui, handler: F)
    where
        F: Fn() + 'static;

    fn bind_full_log<F>(ui: &Self::Ui, handler: F)
    where
        F: Fn() + 'static;
}

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub fn run<B: HostBindings>() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config)?);
    info!(server = %config.server_url, "starting led panel");

    let ui = B::new_ui()?;
    let ui_weak = ui.as_weak();
    let dropped_count = Arc::new(AtomicU64::new(0));
    let queue_capacity = config.outbound_queue_cap;
    let (tx, rx) = mpsc::sync_channel(queue_capacity);

    install_callbacks::<B>(&ui, tx.clone(), dropped_count, queue_capacity);

    let writer_transport = transport.clone();
    let writer_ui = ui_weak.clone();
    let writer_handle = thread::spawn(move || {
        dispatch_loop(rx, writer_transport.as_ref(), |completion| {
            let _ = writer_ui
                .upgrade_in_event_loop(move |ui| sync::apply_completion(&ui, completion));
        });
    });

    let listener_transport = transport.clone();
    let listener_ui = ui_weak.clone();
    let reconnect_delay = config.reconnect_delay;
    let listener_handle = thread::spawn(move || {
        let mut listener = StreamListener::new(listener_transport, reconnect_delay);
        listener.run(|data| {
            let posted = listener_ui.upgrade_in_event_loop(move |ui| {
                let _ = sync::handle_stream_data(&ui, &data);
            });
            continue_while_posted(posted)
        });
    });

    let poller_ui = ui_weak;
    let poll_interval = config.poll_interval;
    let poller_handle = thread::spawn(move || {
        let poller = UserCountPoller::new(transport, poll_interval);
        poller.run(|count| {
            let posted = poller_ui.upgrade_in_event_loop(move |ui| ui.set_user_count(&count));
            continue_while_posted(posted)
        });
    });

    ui.run()?;

    // Drop UI first so callback closures release their `tx` clones.
    drop(ui);
    drop(tx);

    join_if_finished("outbound writer", writer_handle);
    // Both block on network reads; the process exit tears them down.
    join_if_finished("stream listener", listener_handle);
    join_if_finished("user count poller", poller_handle);

    Ok(())
}

fn install_callbacks<B: HostBindings>(
    ui: &B::Ui,
    tx: SyncSender<Outbound>,
    dropped_count: Arc<AtomicU64>,
    queue_capacity: usize,
) {
    let power_tx = tx.clone();
    let power_drops = dropped_count.clone();
    B::bind_power(ui, move |power| {
        enqueue(
            &power_tx,
            Outbound::Command(Command::power(power)),
            &power_drops,
            queue_capacity,
        );
    });

    let brightness_tx = tx.clone();
    let brightness_drops = dropped_count.clone();
    B::bind_brightness_commit(ui, move |value| {
        enqueue(
            &brightness_tx,
            Outbound::Command(Command::brightness(slider_percentage(value))),
            &brightness_drops,
            queue_capacity,
        );
    });

    let color_tx = tx.clone();
    let color_drops = dropped_count.clone();
    B::bind_color_commit(ui, move |raw| match parse_hex_color(&raw) {
        Some(rgb) => enqueue(
            &color_tx,
            Outbound::Command(Command::color(rgb)),
            &color_drops,
            queue_capacity,
        ),
        None => debug!(input = %raw, "ignoring color that is not #rrggbb"),
    });

    let clear_tx = tx.clone();
    let clear_drops = dropped_count.clone();
    B::bind_clear_log(ui, move || {
        enqueue(&clear_tx, Outbound::ClearLog, &clear_drops, queue_capacity);
    });

    let full_log_tx = tx;
    let full_log_drops = dropped_count;
    B::bind_full_log(ui, move || {
        enqueue(
            &full_log_tx,
            Outbound::FetchFullLog,
            &full_log_drops,
            queue_capacity,
        );
    });
}

fn enqueue(
    tx: &SyncSender<Outbound>,
    outbound: Outbound,
    dropped_count: &AtomicU64,
    queue_capacity: usize,
) {
    match tx.try_send(outbound) {
        Ok(()) => {}
        Err(TrySendError::Full(outbound)) => {
            let dropped = dropped_count.fetch_add(1, Ordering::Relaxed) + 1;
            if dropped == 1 || dropped.is_power_of_two() {
                warn!(
                    cap = queue_capacity,
                    dropped,
                    ?outbound,
                    "outbound queue full; dropping request"
                );
            }
        }
        Err(TrySendError::Disconnected(outbound)) => {
            error!(?outbound, "outbound queue closed");
        }
    }
}

fn slider_percentage(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }

    value.round().clamp(0.0, f32::from(MAX_BRIGHTNESS)) as u8
}

fn continue_while_posted(posted: Result<(), slint::EventLoopError>) -> ControlFlow<()> {
    match posted {
        Ok(()) => ControlFlow::Continue(()),
        Err(err) => {
            debug!(%err, "ui event loop gone");
            ControlFlow::Break(())
        }
    }
}

fn join_if_finished(name: &str, handle: JoinHandle<()>) {
    if handle.is_finished() {
        if let Err(err) = handle.join() {
            error!("{name} thread panicked: {err:?}");
        }
    } else {
        debug!("{name} thread still active during shutdown; skipping join");
    }
}

#[macro_export]
macro_rules! app_main {
    ($window:ty) => {
        struct LedPanelBindings;

        impl $crate::PanelView for $window {
            fn set_power(&self, power: $crate::PowerState) {
                self.set_power_on(power.is_on());
            }

            fn brightness_focused(&self) -> bool {
                self.get_brightness_focused()
            }

            fn set_brightness(&self, brightness: u8) {
                self.set_brightness_level(f32::from(brightness));
            }

            fn color_focused(&self) -> bool {
                self.get_color_focused()
            }

            fn set_color(&self, hex: &str) {
                self.set_color_text(hex.into());
                if let Some(rgb) = $crate::parse_hex_color(hex) {
                    self.set_swatch(slint::Color::from_rgb_u8(rgb.r, rgb.g, rgb.b));
                }
            }

            fn log_text(&self) -> String {
                self.get_log_contents().to_string()
            }

            fn set_log_text(&self, text: &str) {
                self.set_log_contents(text.into());
            }

            fn scroll_log_to_end(&self) {
                self.invoke_scroll_log_to_end();
            }

            fn set_user_count(&self, count: &str) {
                self.set_viewer_count(count.into());
            }
        }

        impl $crate::HostBindings for LedPanelBindings {
            type Ui = $window;

            fn new_ui() -> Result<Self::Ui, slint::PlatformError> {
                <Self::Ui>::new()
            }

            fn bind_power<F>(ui: &Self::Ui, handler: F)
            where
                F: Fn($crate::PowerState) + 'static,
            {
                ui.on_power(move |on| {
                    handler(if on {
                        $crate::PowerState::On
                    } else {
                        $crate::PowerState::Off
                    });
                });
            }

            fn bind_brightness_commit<F>(ui: &Self::Ui, handler: F)
            where
                F: Fn(f32) + 'static,
            {
                ui.on_brightness_committed(move |value| handler(value));
            }

            fn bind_color_commit<F>(ui: &Self::Ui, handler: F)
            where
                F: Fn(String) + 'static,
            {
                ui.on_color_committed(move |text| handler(text.to_string()));
            }

            fn bind_clear_log<F>(ui: &Self::Ui, handler: F)
            where
                F: Fn() + 'static,
            {
                ui.on_clear_log(move || handler());
            }

            fn bind_full_log<F>(ui: &Self::Ui, handler: F)
            where
                F: Fn() + 'static,
            {
                ui.on_load_full_log(move || handler());
            }
        }

        fn main() {
            $crate::init_logging();

            if let Err(err) = $crate::run::<LedPanelBindings>() {
                $crate::tracing::error!("led panel fatal error: {err}");
                std::process::exit(1);
            }
        }
    };
}
