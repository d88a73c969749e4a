use macroquad::prelude::*;
use shared::{Player, TileGrid, PLAYER_SIZE};

const BACKGROUND: Color = Color::new(0.33, 0.75, 0.79, 1.0);
const TILE: Color = Color::new(0.27, 0.27, 0.27, 1.0);
const REMOTE: Color = Color::new(1.0, 0.27, 0.27, 1.0);

/// Draws the world scaled to fit the window, letterboxed.
pub struct Renderer {
    world_width: f32,
    world_height: f32,
}

impl Renderer {
    pub fn new(grid: &TileGrid) -> Self {
        Renderer {
            world_width: grid.world_width(),
            world_height: grid.world_height(),
        }
    }

    pub fn render<'a>(
        &self,
        grid: &TileGrid,
        local: Option<&Player>,
        remotes: impl Iterator<Item = &'a Player>,
        connected: bool,
    ) {
        clear_background(BLACK);

        let (scale, offset_x, offset_y) = self.fit(screen_width(), screen_height());
        draw_rectangle(
            offset_x,
            offset_y,
            self.world_width * scale,
            self.world_height * scale,
            BACKGROUND,
        );

        let tile = grid.tile_size() * scale;
        for (cx, cy) in grid.solid_cells() {
            draw_rectangle(
                offset_x + cx as f32 * tile,
                offset_y + cy as f32 * tile,
                tile,
                tile,
                TILE,
            );
        }

        for player in remotes {
            self.draw_player(player, REMOTE, scale, offset_x, offset_y);
        }
        if let Some(player) = local {
            self.draw_player(player, GREEN, scale, offset_x, offset_y);
        }

        self.draw_status(connected, local);
    }

    /// Scale and top-left offset that fit the world inside the window.
    fn fit(&self, width: f32, height: f32) -> (f32, f32, f32) {
        let scale = (width / self.world_width)
            .min(height / self.world_height)
            .max(0.0);
        let offset_x = (width - self.world_width * scale) / 2.0;
        let offset_y = (height - self.world_height * scale) / 2.0;
        (scale, offset_x, offset_y)
    }

    fn draw_player(&self, player: &Player, color: Color, scale: f32, ox: f32, oy: f32) {
        let x = ox + player.x * scale;
        let y = oy + player.y * scale;
        let size = PLAYER_SIZE * scale;

        draw_rectangle(x, y, size, size, color);
        draw_rectangle_lines(x, y, size, size, 2.0, WHITE);
        draw_text(&player.id, x, y - 4.0, 16.0, WHITE);
    }

    fn draw_status(&self, connected: bool, local: Option<&Player>) {
        let color = if connected { GREEN } else { RED };
        draw_rectangle(10.0, 10.0, 8.0, 8.0, color);
        draw_text("CON", 22.0, 18.0, 14.0, WHITE);

        if let Some(player) = local {
            let text = format!("{} ({:.1}, {:.1})", player.id, player.x, player.y);
            draw_text(&text, 10.0, 34.0, 14.0, WHITE);
        }
    }
}
