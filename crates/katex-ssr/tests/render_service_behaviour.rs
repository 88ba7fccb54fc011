//! Behavioural tests for the render service using `rstest-bdd`.

mod support;

use katex_ssr::RenderChannel;
use katex_ssr::RenderService;
use katex_ssr::service::FALLBACK_CLASS;
use katex_ssr_protocol::RenderOptions;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

struct World {
    service: RenderService,
    outputs: Vec<String>,
}

impl Default for World {
    fn default() -> Self {
        Self {
            service: support::service(),
            outputs: Vec::new(),
        }
    }
}

impl World {
    fn last_output(&self) -> &str {
        self.outputs.last().expect("a formula was rendered")
    }
}

#[fixture]
fn world() -> World {
    World::default()
}

#[given("a render service over the worker")]
fn given_service(world: &mut World) {
    *world = World::default();
}

#[when("the caller renders {latex} with the extension {name}")]
fn when_render_with_extension(world: &mut World, latex: String, name: String) {
    let contribs = vec![name.trim_matches('"').to_owned()];
    let html = world
        .service
        .render(latex.trim_matches('"'), false, &RenderOptions::new(), &contribs)
        .expect("render succeeds");
    world.outputs.push(html);
}

#[when("the caller renders {latex} inline")]
fn when_render(world: &mut World, latex: String) {
    let html = world
        .service
        .render_formula(latex.trim_matches('"'), false)
        .expect("render succeeds");
    world.outputs.push(html);
}

#[then("the worker was called {count} times")]
fn then_worker_calls(world: &mut World, count: u64) {
    assert_eq!(world.service.stats().worker_calls, count);
}

#[then("{count} renders were cache hits")]
fn then_cache_hits(world: &mut World, count: u64) {
    assert_eq!(world.service.stats().cache_hits, count);
}

#[then("{count} renders failed")]
fn then_render_errors(world: &mut World, count: u64) {
    assert_eq!(world.service.stats().render_errors, count);
}

#[then("both outputs are identical")]
fn then_identical(world: &mut World) {
    let [first, second] = world.outputs.as_slice() else {
        panic!("expected two outputs, got {}", world.outputs.len());
    };
    assert_eq!(first, second);
}

#[then("the last output is fallback markup containing {source}")]
fn then_fallback(world: &mut World, source: String) {
    let html = world.last_output();
    assert!(html.contains(FALLBACK_CLASS), "unexpected markup: {html}");
    assert!(html.contains(source.trim_matches('"')));
}

#[then("the last output is KaTeX markup")]
fn then_katex(world: &mut World) {
    let html = world.last_output();
    assert!(html.contains(r#"class="katex""#), "unexpected markup: {html}");
    assert!(!html.contains(FALLBACK_CLASS));
}

#[then("the cache holds {count} entries")]
fn then_cache_len(world: &mut World, count: usize) {
    assert_eq!(world.service.cache().len(), count);
}

#[then("the worker holds the extension {name}")]
fn then_extension(world: &mut World, name: String) {
    let active = world.service.channel().active_contribs();
    assert!(active.iter().any(|entry| entry == name.trim_matches('"')));
}

#[scenario(
    path = "tests/features/render_service.feature",
    name = "Repeated formulas are served from the cache"
)]
fn repeated_formulas_hit_the_cache(world: World) {
    let _ = world;
}

#[scenario(
    path = "tests/features/render_service.feature",
    name = "Rejected formulas degrade to marked-up source"
)]
fn rejected_formulas_degrade(world: World) {
    let _ = world;
}

#[scenario(
    path = "tests/features/render_service.feature",
    name = "Extensions requested per call become available"
)]
fn extensions_become_available(world: World) {
    let _ = world;
}
