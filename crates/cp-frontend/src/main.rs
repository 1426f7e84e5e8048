//! CadPrompt main entry point

// Native entry point
#[cfg(not(target_arch = "wasm32"))]
fn main() -> eframe::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "cp_frontend=debug,cp_core=debug,cp_renderer=info,cp_kernel=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting CadPrompt");

    let config = cp_frontend::AppConfig::load_or_default(cp_frontend::config::CONFIG_FILE);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([640.0, 480.0])
            .with_title("CadPrompt"),
        persist_window: false,
        ..Default::default()
    };

    eframe::run_native(
        "cadprompt",
        native_options,
        Box::new(|cc| Ok(Box::new(cp_frontend::CadPromptApp::new(cc, config)))),
    )
}

// WASM entry point
#[cfg(target_arch = "wasm32")]
fn main() {
    use eframe::wasm_bindgen::JsCast;

    console_error_panic_hook::set_once();

    // tracing events reach the console through the `log` bridge
    eframe::WebLogger::init(log::LevelFilter::Debug).ok();

    let web_options = eframe::WebOptions::default();

    wasm_bindgen_futures::spawn_local(async {
        let Some(document) = web_sys::window().and_then(|window| window.document()) else {
            log::error!("No document to mount CadPrompt into");
            return;
        };

        let Some(canvas) = document
            .get_element_by_id("cadprompt-canvas")
            .and_then(|element| element.dyn_into::<web_sys::HtmlCanvasElement>().ok())
        else {
            log::error!("cadprompt-canvas was not found or is not a canvas");
            return;
        };

        let start_result = eframe::WebRunner::new()
            .start(
                canvas,
                web_options,
                Box::new(|cc| {
                    Ok(Box::new(cp_frontend::CadPromptApp::new(
                        cc,
                        cp_frontend::AppConfig::default(),
                    )))
                }),
            )
            .await;

        // Replace the page's loading placeholder
        if let Some(loading_text) = document.get_element_by_id("loading") {
            match start_result {
                Ok(_) => {
                    loading_text.remove();
                }
                Err(e) => {
                    loading_text.set_inner_html(&format!(
                        "<p>CadPrompt failed to start. See the developer console.</p><p>{e:?}</p>"
                    ));
                }
            }
        }
    });
}
