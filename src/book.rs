use std::time::Instant;

use futures_util::FutureExt;

use crate::dom::Dom;
use crate::engine::RenderEngine;
use crate::error::{AppError, AppResult};
use crate::render::{RenderDriver, RenderQueue};
use crate::session::RenderSession;
use crate::store::ArtifactStore;

pub const APP_CLASS: &str = "typst-app";
const APPLIED_WIDTH: &str = "data-applied-width";

/// State shared by every queued book page operation.
pub struct BookState<E: RenderEngine, D: Dom> {
    driver: RenderDriver<E>,
    dom: D,
    app: D::Node,
    store: ArtifactStore,
    rel_path: String,
    theme: String,
    session: Option<RenderSession<E>>,
    renders: usize,
}

impl<E: RenderEngine, D: Dom> BookState<E, D> {
    pub fn dom(&self) -> &D {
        &self.dom
    }

    pub fn app(&self) -> &D::Node {
        &self.app
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn renders(&self) -> usize {
        self.renders
    }

    pub fn session(&self) -> Option<&RenderSession<E>> {
        self.session.as_ref()
    }

    fn reload_artifact(&mut self) -> AppResult<()> {
        if let Some(mut previous) = self.session.take()
            && let Err(err) = previous.free()
        {
            log::debug!("ignoring failure to free previous session: {err}");
        }
        self.dom.set_inner_html(&self.app, "");
        self.dom.remove_attribute(&self.app, APPLIED_WIDTH);

        let started = Instant::now();
        let bytes = self.store.load(&self.rel_path, &self.theme)?;
        let loaded = started.elapsed();
        let session = self.driver.create_session(Some(bytes.as_ref().clone()))?;
        log::info!(
            "theme = {}, load artifact took {:.1}ms, parse artifact took {:.1}ms",
            self.theme,
            loaded.as_secs_f64() * 1000.0,
            (started.elapsed() - loaded).as_secs_f64() * 1000.0
        );
        self.session = Some(session);
        Ok(())
    }

    fn run_render(&mut self) -> AppResult<()> {
        self.dom.set_style(&self.app, "margin", "0px");
        let session = self.session.as_mut().ok_or(AppError::SessionReleased)?;
        self.driver.render_svg(session, &mut self.dom, &self.app)?;

        let applied_width = self
            .dom
            .attribute(&self.app, APPLIED_WIDTH)
            .and_then(|width| width.trim_end_matches("px").parse::<f64>().ok());
        if let Some(svg_width) = applied_width {
            let parent_width = self
                .dom
                .parent(&self.app)
                .map_or(0.0, |parent| self.dom.offset_width(&parent));
            let margin = (parent_width - svg_width) / 2.0;
            if margin < 0.0 {
                self.dom.set_style(&self.app, "margin", "0px");
            } else {
                self.dom
                    .set_style(&self.app, "margin", &format!("0 {margin}px"));
            }
        }
        self.renders += 1;
        Ok(())
    }
}

/// A book page bound to one artifact path. Reloads and renders run one at a
/// time through a serial queue.
pub struct BookPage<E: RenderEngine, D: Dom> {
    queue: RenderQueue<BookState<E, D>>,
}

impl<E: RenderEngine, D: Dom> BookPage<E, D> {
    /// Mounts an app element under `container`, loads the artifact for
    /// `theme` and renders it.
    pub async fn open(
        driver: RenderDriver<E>,
        mut dom: D,
        container: &D::Node,
        store: ArtifactStore,
        rel_path: impl Into<String>,
        theme: impl Into<String>,
    ) -> AppResult<Self> {
        let app = dom.create_child(container, "div");
        dom.set_class_name(&app, APP_CLASS);

        let page = Self {
            queue: RenderQueue::new(BookState {
                driver,
                dom,
                app,
                store,
                rel_path: rel_path.into(),
                theme: theme.into(),
                session: None,
                renders: 0,
            }),
        };
        page.queue
            .submit(|state| {
                async move {
                    state.reload_artifact()?;
                    state.run_render()
                }
                .boxed_local()
            })
            .await?;
        Ok(page)
    }

    pub async fn rerender(&self) -> AppResult<()> {
        self.queue
            .submit(|state| async move { state.run_render() }.boxed_local())
            .await
    }

    /// Returns `false` when `theme` is already current.
    pub async fn change_theme(&self, theme: impl Into<String>) -> AppResult<bool> {
        let theme = theme.into();
        self.queue
            .submit(move |state| {
                async move {
                    if state.theme == theme {
                        return Ok(false);
                    }
                    state.theme = theme;
                    state.reload_artifact()?;
                    state.run_render()?;
                    Ok(true)
                }
                .boxed_local()
            })
            .await
    }

    pub async fn inspect<T, F>(&self, read: F) -> T
    where
        F: FnOnce(&BookState<E, D>) -> T + 'static,
        T: 'static,
    {
        self.queue
            .submit(move |state| async move { read(state) }.boxed_local())
            .await
    }

    pub fn pending(&self) -> u64 {
        self.queue.pending()
    }

    /// Frees the current session and hands back the host.
    pub fn close(self) -> AppResult<D> {
        let mut state = self.queue.into_inner();
        if let Some(mut session) = state.session.take() {
            session.free()?;
        }
        Ok(state.dom)
    }
}
