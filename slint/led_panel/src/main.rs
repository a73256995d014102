slint::include_modules!();

led_panel_runtime::app_main!(AppWindow);
