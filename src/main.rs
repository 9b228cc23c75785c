//! Merge Drop entry point
//!
//! Native builds run a headless autoplay session; wasm32 builds drive the
//! simulation from the browser's animation frames.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use std::path::PathBuf;
    use std::sync::Arc;

    use clap::Parser;
    use glam::Vec2;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    use merge_drop::host::{AudioError, AudioSink, HudSink, HudSnapshot, dispatch_events};
    use merge_drop::sim::{
        GameEvent, GamePhase, GameState, PurchaseTarget, Registry, RoundOutcome, SoundCue,
        TickInput, launch_vector, tick,
    };
    use merge_drop::{SimResult, Tuning};

    const FRAME_MS: f64 = 1000.0 / 60.0;

    /// Headless autoplay runner
    #[derive(Parser, Debug)]
    #[command(name = "merge-drop", version, about)]
    pub struct Args {
        /// Session seed
        #[arg(long, default_value_t = 1)]
        pub seed: u64,
        /// Stop after this many rounds have been won
        #[arg(long, default_value_t = 5)]
        pub rounds: u32,
        /// JSON tuning file (missing fields keep their defaults)
        #[arg(long)]
        pub tuning: Option<PathBuf>,
        /// Frame budget (60 frames per simulated second)
        #[arg(long, default_value_t = 200_000)]
        pub frames: u64,
    }

    struct LogAudio;

    impl AudioSink for LogAudio {
        fn play(&mut self, cue: SoundCue) -> Result<(), AudioError> {
            log::trace!("cue {:?}", cue);
            Ok(())
        }
    }

    #[derive(Default)]
    struct LogHud {
        last: Option<HudSnapshot>,
    }

    impl HudSink for LogHud {
        fn update(&mut self, hud: &HudSnapshot) {
            log::debug!(
                "round {} score {}/{} gold {} lives {} deck {}",
                hud.round,
                hud.score,
                hud.target_score,
                hud.gold,
                hud.lives,
                hud.deck_count
            );
            self.last = Some(hud.clone());
        }
    }

    /// Buy the cheapest affordable offers, then leave the shop
    fn shop_turn(state: &mut GameState) -> SimResult<()> {
        loop {
            let cheapest = state
                .shop_offers
                .iter()
                .enumerate()
                .filter(|(_, offer)| offer.cost <= state.gold)
                .min_by_key(|(_, offer)| offer.cost)
                .map(|(slot, _)| slot);
            let Some(slot) = cheapest else { break };
            state.buy_offer(slot, PurchaseTarget::Deck)?;
        }
        state.close_shop()
    }

    pub fn run(args: Args) -> SimResult<()> {
        let tuning = match &args.tuning {
            Some(path) => Tuning::load(path)?,
            None => Tuning::default(),
        };
        let mut state = GameState::with_config(args.seed, tuning, Arc::new(Registry::default()));
        let mut bot = Pcg32::seed_from_u64(args.seed ^ 0x9e37_79b9_7f4a_7c15);
        let mut audio = LogAudio;
        let mut hud = LogHud::default();
        let mut rounds_won = 0;
        let mut now = 0.0;

        for _ in 0..args.frames {
            let mut input = TickInput::default();
            if state.can_throw(now)
                && let Some(piece) = &state.current_piece
            {
                let pull = Vec2::new(bot.random_range(-60.0..60.0), bot.random_range(-40.0..0.0));
                input.launch = Some(launch_vector(
                    piece.pos,
                    piece.pos + pull,
                    &state.tuning.physics,
                ));
            }
            tick(&mut state, &input, now);
            now += FRAME_MS;

            let events = state.drain_events();
            dispatch_events(&events, &state, &mut audio, &mut hud);
            for event in &events {
                if let GameEvent::RoundCompleted(outcome) = event {
                    match outcome {
                        RoundOutcome::Won { reward } => {
                            rounds_won += 1;
                            log::info!("Round won, +{} gold", reward);
                        }
                        RoundOutcome::Lost { lives_left } => {
                            log::info!("Round lost, {} lives left", lives_left);
                        }
                    }
                }
            }

            match state.phase {
                GamePhase::GameOver => break,
                _ if rounds_won >= args.rounds => break,
                GamePhase::ShopOpen => shop_turn(&mut state)?,
                GamePhase::InRound => {}
            }
        }

        let summary = hud.last.unwrap_or_else(|| state.hud_snapshot());
        log::info!(
            "Finished: {} rounds won, reached round {}, total score {}, {:.1}s simulated",
            rounds_won,
            summary.round,
            state.total_score,
            state.sim_time
        );
        match serde_json::to_string_pretty(&state.hud_snapshot()) {
            Ok(json) => println!("{json}"),
            Err(e) => log::warn!("Could not serialise summary: {}", e),
        }
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, HtmlCanvasElement, KeyboardEvent, PointerEvent};

    use merge_drop::audio::WebAudio;
    use merge_drop::host::{HudSink, HudSnapshot, dispatch_events};
    use merge_drop::sim::{
        GameEvent, GamePhase, GameState, PurchaseTarget, TickInput, launch_vector, tick,
    };

    // Drawing and the shop panel live in page script
    #[wasm_bindgen(inline_js = "
        export function draw_frame(json) {
            if (typeof window.mergeDropRender === 'function') {
                window.mergeDropRender(JSON.parse(json));
            }
        }
        export function show_shop(json) {
            if (typeof window.mergeDropShop === 'function') {
                window.mergeDropShop(JSON.parse(json));
            }
        }
    ")]
    extern "C" {
        fn draw_frame(json: &str);
        fn show_shop(json: &str);
    }

    /// Writes HUD values into DOM elements
    struct DomHud {
        document: Document,
    }

    impl DomHud {
        fn set_text(&self, selector: &str, text: &str) {
            if let Some(el) = self.document.query_selector(selector).ok().flatten() {
                el.set_text_content(Some(text));
            }
        }

        fn set_visible(&self, id: &str, visible: bool) {
            if let Some(el) = self.document.get_element_by_id(id) {
                let _ = el.set_attribute("class", if visible { "" } else { "hidden" });
            }
        }
    }

    impl HudSink for DomHud {
        fn update(&mut self, hud: &HudSnapshot) {
            self.set_text("#hud-score .hud-value", &format!("{}/{}", hud.score, hud.target_score));
            self.set_text("#hud-round .hud-value", &hud.round.to_string());
            self.set_text("#hud-gold .hud-value", &hud.gold.to_string());
            self.set_text("#hud-lives .hud-value", &hud.lives.to_string());
            self.set_text("#hud-deck .hud-value", &hud.deck_count.to_string());
            self.set_visible("pause-menu", hud.paused);
            self.set_visible("shop", hud.phase == GamePhase::ShopOpen);
            self.set_visible("game-over", hud.phase == GamePhase::GameOver);
            if hud.phase == GamePhase::GameOver {
                self.set_text("#final-score", &hud.total_score.to_string());
                self.set_text("#final-round", &hud.round.to_string());
            }
        }
    }

    struct Game {
        state: GameState,
        input: TickInput,
        audio: WebAudio,
        hud: DomHud,
        canvas: HtmlCanvasElement,
        drag_start: Option<Vec2>,
        debug: bool,
        selected: Option<u32>,
    }

    impl Game {
        fn frame(&mut self, time: f64) {
            let input = std::mem::take(&mut self.input);
            tick(&mut self.state, &input, time);

            let events = self.state.drain_events();
            dispatch_events(&events, &self.state, &mut self.audio, &mut self.hud);
            if events.iter().any(|e| matches!(e, GameEvent::ShopOpened)) {
                self.refresh_shop();
            }

            let frame = self.state.render_frame(self.debug, self.selected);
            match serde_json::to_string(&frame) {
                Ok(json) => draw_frame(&json),
                Err(e) => log::warn!("Render frame not serialisable: {}", e),
            }
        }

        fn refresh_shop(&self) {
            match serde_json::to_string(&self.state.shop_view()) {
                Ok(json) => show_shop(&json),
                Err(e) => log::warn!("Shop view not serialisable: {}", e),
            }
        }

        /// Client coordinates to container pixels
        fn to_world(&self, event: &PointerEvent) -> Vec2 {
            let rect = self.canvas.get_bounding_client_rect();
            let sx = self.state.container.width / rect.width().max(1.0) as f32;
            let sy = self.state.container.height / rect.height().max(1.0) as f32;
            Vec2::new(
                (event.client_x() as f64 - rect.left()) as f32 * sx,
                (event.client_y() as f64 - rect.top()) as f32 * sy,
            )
        }

        fn hovered_piece(&self, at: Vec2) -> Option<u32> {
            self.state
                .pieces
                .iter()
                .find(|p| p.pos.distance(at) <= p.radius)
                .map(|p| p.id)
        }

        fn on_key(&mut self, event: &KeyboardEvent) {
            let key = event.key();
            match (self.state.phase, key.as_str()) {
                (_, "Escape") => self.input.pause = true,
                (_, "d") => self.debug = !self.debug,
                (_, "r") => {
                    let seed = js_sys::Date::now() as u64;
                    self.state.restart(seed);
                    self.input = TickInput::default();
                }
                (GamePhase::ShopOpen, "Enter") => {
                    if let Err(e) = self.state.close_shop() {
                        log::warn!("{}", e);
                    }
                }
                (GamePhase::ShopOpen, "e") => {
                    if let Err(e) = self.state.equip_from_inventory(0) {
                        log::warn!("{}", e);
                    }
                    self.refresh_shop();
                }
                (GamePhase::ShopOpen, digit) => {
                    let Some(slot) = digit
                        .parse::<usize>()
                        .ok()
                        .and_then(|n| n.checked_sub(1))
                    else {
                        return;
                    };
                    let target = if event.shift_key() {
                        PurchaseTarget::Inventory
                    } else {
                        PurchaseTarget::Deck
                    };
                    if let Err(e) = self.state.buy_offer(slot, target) {
                        log::warn!("{}", e);
                    }
                    self.refresh_shop();
                }
                _ => {}
            }
        }
    }

    pub fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("logger init failed: {e}").into());
        }
        log::info!("Merge Drop starting...");

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;
        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .ok_or("no #canvas element")?
            .dyn_into()?;

        let seed = js_sys::Date::now() as u64;
        let state = GameState::new(seed);
        canvas.set_width(state.container.width as u32);
        canvas.set_height(state.container.height as u32);

        let game = Rc::new(RefCell::new(Game {
            state,
            input: TickInput::default(),
            audio: WebAudio::new(),
            hud: DomHud { document },
            canvas: canvas.clone(),
            drag_start: None,
            debug: false,
            selected: None,
        }));

        setup_input_handlers(&window, &canvas, game.clone())?;
        request_animation_frame(game);
        Ok(())
    }

    fn setup_input_handlers(
        window: &web_sys::Window,
        canvas: &HtmlCanvasElement,
        game: Rc<RefCell<Game>>,
    ) -> Result<(), JsValue> {
        // Drag start
        {
            let game = game.clone();
            let target = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
                let mut g = game.borrow_mut();
                g.audio.resume();
                let at = g.to_world(&event);
                g.drag_start = Some(at);
                let _ = target.set_pointer_capture(event.pointer_id());
            });
            canvas.add_event_listener_with_callback("pointerdown", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        // Hover highlight
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
                let mut g = game.borrow_mut();
                let at = g.to_world(&event);
                g.selected = g.hovered_piece(at);
            });
            canvas.add_event_listener_with_callback("pointermove", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        // Release fires
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
                let mut g = game.borrow_mut();
                let Some(start) = g.drag_start.take() else { return };
                let end = g.to_world(&event);
                let launch = launch_vector(start, end, &g.state.tuning.physics);
                g.input.launch = Some(launch);
            });
            canvas.add_event_listener_with_callback("pointerup", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        // Keyboard
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                game.borrow_mut().on_key(&event);
            });
            window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }
        Ok(())
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else { return };
        let closure = Closure::once(move |time: f64| {
            game.borrow_mut().frame(time);
            request_animation_frame(game);
        });
        if let Err(e) = window.request_animation_frame(closure.as_ref().unchecked_ref()) {
            log::error!("requestAnimationFrame failed: {:?}", e);
        }
        closure.forget();
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    wasm_game::run()
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use clap::Parser;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = headless::Args::parse();
    log::info!("Merge Drop (headless) seed {}", args.seed);
    if let Err(e) = headless::run(args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main
}
