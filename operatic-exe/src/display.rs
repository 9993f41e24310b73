//! Draws a `Snapshot` as one bar per parameter of the current channel and its
//! operators. The window title carries the cursor and selected value.

use patch::{ChannelParam, OperatorParam, Param, Snapshot};
use sdl2::{pixels::Color, rect::Rect, render::Canvas, video::Window};

pub const SCREEN_WIDTH: u32 = 320;
pub const SCREEN_HEIGHT: u32 = 200;

const BAR_WIDTH: i32 = 5;
const BAR_STRIDE: i32 = 6;
const GROUP_GAP: i32 = 4;
const LEFT: i32 = 6;
const BASELINE: i32 = 190;
const MAX_HEIGHT: u32 = 160;

const BACKGROUND: Color = Color::RGB(16, 16, 24);
const OUTLINE: Color = Color::RGB(48, 48, 64);
const CHANNEL_BAR: Color = Color::RGB(90, 160, 220);
const OPERATOR_BAR: Color = Color::RGB(120, 200, 120);
const SELECTED_BAR: Color = Color::RGB(250, 200, 60);
const DIRTY_MARK: Color = Color::RGB(220, 60, 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarKind {
    Channel,
    Operator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bar {
    pub x: i32,
    pub height: u32,
    pub kind: BarKind,
    pub selected: bool,
    /// The owning entity has unflushed edits
    pub dirty: bool,
}

impl Bar {
    fn frame(&self) -> Rect {
        Rect::new(self.x, BASELINE - MAX_HEIGHT as i32, BAR_WIDTH as u32, MAX_HEIGHT)
    }

    fn fill(&self) -> Option<Rect> {
        (self.height > 0).then(|| {
            Rect::new(
                self.x,
                BASELINE - self.height as i32,
                BAR_WIDTH as u32,
                self.height,
            )
        })
    }
}

/// Scale a parameter value into the bar area
fn bar_height(value: u16, mask: u16) -> u32 {
    if mask == 0 {
        return 0;
    }
    value as u32 * MAX_HEIGHT / mask as u32
}

/// Lay out the bars for the cursor's channel followed by each operator the
/// model can address on it, in slot order
pub fn layout(snap: &Snapshot) -> Vec<Bar> {
    let cursor = snap.cursor;
    let channel = snap.channel(cursor.channel);
    let channel_dirty = snap.channel_dirty[cursor.channel.index()];

    let mut bars = Vec::with_capacity(4 + 4 * OperatorParam::ALL.len());
    let mut x = LEFT;
    for p in ChannelParam::ALL {
        bars.push(Bar {
            x,
            height: bar_height(channel.get(p), p.mask()),
            kind: BarKind::Channel,
            selected: cursor.param == Param::Channel(p),
            dirty: channel_dirty,
        });
        x += BAR_STRIDE;
    }

    let current = snap.current_operator();
    for op in snap.model.operators(cursor.channel) {
        x += GROUP_GAP;
        let state = snap.operator(op);
        let dirty = snap.operator_dirty[op.index()];
        for p in OperatorParam::ALL {
            bars.push(Bar {
                x,
                height: bar_height(state.get(p), p.mask()),
                kind: BarKind::Operator,
                selected: Some(op) == current && cursor.param == Param::Operator(p),
                dirty,
            });
            x += BAR_STRIDE;
        }
    }
    bars
}

pub struct Display {
    canvas: Canvas<Window>,
    title: String,
}

impl Display {
    pub fn new(window: Window) -> Result<Self, String> {
        let canvas = window
            .into_canvas()
            .accelerated()
            .present_vsync()
            .build()
            .map_err(|e| e.to_string())?;
        Ok(Self {
            canvas,
            title: String::new(),
        })
    }

    pub fn draw(&mut self, snap: &Snapshot) -> Result<(), String> {
        let title = snap.title();
        if title != self.title {
            self.canvas
                .window_mut()
                .set_title(&title)
                .map_err(|e| e.to_string())?;
            self.title = title;
        }

        self.canvas.set_draw_color(BACKGROUND);
        self.canvas.clear();
        for bar in layout(snap) {
            self.canvas.set_draw_color(OUTLINE);
            self.canvas.draw_rect(bar.frame())?;
            if let Some(fill) = bar.fill() {
                let color = match (bar.selected, bar.kind) {
                    (true, _) => SELECTED_BAR,
                    (false, BarKind::Channel) => CHANNEL_BAR,
                    (false, BarKind::Operator) => OPERATOR_BAR,
                };
                self.canvas.set_draw_color(color);
                self.canvas.fill_rect(fill)?;
            }
            if bar.selected {
                self.canvas.set_draw_color(SELECTED_BAR);
                self.canvas.fill_rect(Rect::new(bar.x, BASELINE + 3, BAR_WIDTH as u32, 3))?;
            }
            if bar.dirty {
                self.canvas.set_draw_color(DIRTY_MARK);
                self.canvas.fill_rect(Rect::new(bar.x, BASELINE + 7, BAR_WIDTH as u32, 1))?;
            }
        }
        self.canvas.present();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patch::{EditCommand, Editor, Model, ParameterStore};

    fn snapshot(model: Model, commands: &[EditCommand]) -> Snapshot {
        let mut store = ParameterStore::new();
        let mut editor = Editor::new(model);
        for cmd in commands {
            editor.apply(&mut store, *cmd);
        }
        Snapshot::take(&store, &editor)
    }

    #[test]
    fn test_bar_count_follows_model() {
        let two = snapshot(Model::TwoOp, &[]);
        assert_eq!(layout(&two).len(), 4 + 2 * 11);

        let four = snapshot(Model::FourOp, &[]);
        assert_eq!(layout(&four).len(), 4 + 4 * 11);

        let four_plain = snapshot(Model::FourOp, &[EditCommand::SelectChannel(6)]);
        assert_eq!(layout(&four_plain).len(), 4 + 2 * 11);
    }

    #[test]
    fn test_bars_fit_screen() {
        let bars = layout(&snapshot(Model::FourOp, &[]));
        let last = bars.last().unwrap();
        assert!(last.x + BAR_WIDTH <= SCREEN_WIDTH as i32);
        assert!(bars.windows(2).all(|w| w[0].x < w[1].x));
    }

    #[test]
    fn test_selected_bar() {
        let snap = snapshot(
            Model::TwoOp,
            &[
                EditCommand::SelectOperatorSlot(1),
                EditCommand::SelectParameter(OperatorParam::Attack.into()),
                EditCommand::Set(15),
            ],
        );
        let bars = layout(&snap);
        let selected: Vec<usize> = bars
            .iter()
            .enumerate()
            .filter(|(_, b)| b.selected)
            .map(|(i, _)| i)
            .collect();
        // channel bars, slot 0 group, then attack is the 8th in slot 1
        assert_eq!(selected, vec![4 + 11 + 7]);
        let bar = bars[selected[0]];
        assert_eq!(bar.height, MAX_HEIGHT);
        assert!(bar.dirty);
        assert!(!bars[4].dirty);
    }

    #[test]
    fn test_heights_scale_with_mask() {
        assert_eq!(bar_height(0, 0x3FF), 0);
        assert_eq!(bar_height(0x3FF, 0x3FF), MAX_HEIGHT);
        assert_eq!(bar_height(1, 1), MAX_HEIGHT);
        assert_eq!(bar_height(8, 15), 8 * MAX_HEIGHT / 15);
    }
}
