//! レーティング・手数・終局理由による棋譜の選別

use rshogi_csa::Color;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::{ParsedGame, TerminalResult};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterReject {
    #[error("{0:?} rating is missing")]
    MissingRating(Color),
    #[error("{color:?} rating {rating} is below {min}")]
    LowRating { color: Color, rating: f64, min: u32 },
    #[error("{moves} moves is shorter than {min}")]
    TooShort { moves: usize, min: usize },
    #[error("result {0:?} is not allowed")]
    ResultNotAllowed(TerminalResult),
}

impl FilterReject {
    pub fn reason(&self) -> &'static str {
        match self {
            FilterReject::MissingRating(_) | FilterReject::LowRating { .. } => "rating",
            FilterReject::TooShort { .. } => "min_moves",
            FilterReject::ResultNotAllowed(_) => "result",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameFilter {
    pub min_moves: usize,
    /// 0 で無効
    pub min_rating: u32,
    /// 空なら全ての終局理由を受け付ける
    pub allowed_results: Vec<TerminalResult>,
}

impl GameFilter {
    /// 棋譜を検査する。副作用はない。
    pub fn check(&self, game: &ParsedGame) -> Result<(), FilterReject> {
        if self.min_rating > 0 {
            for color in Color::ALL {
                match game.ratings[color.index()] {
                    None => return Err(FilterReject::MissingRating(color)),
                    Some(rating) if rating < f64::from(self.min_rating) => {
                        return Err(FilterReject::LowRating {
                            color,
                            rating,
                            min: self.min_rating,
                        });
                    }
                    Some(_) => {}
                }
            }
        }
        if game.move_count() < self.min_moves {
            return Err(FilterReject::TooShort {
                moves: game.move_count(),
                min: self.min_moves,
            });
        }
        if !self.allowed_results.is_empty() && !self.allowed_results.contains(&game.result) {
            return Err(FilterReject::ResultNotAllowed(game.result));
        }
        Ok(())
    }
}
