use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::Coordinate;

/// Represents errors that can occur within the grid operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("Coordinate {coordinate} is out of bounds for grid size ({width}, {height})")]
    OutOfBounds {
        coordinate: Coordinate,
        width: usize,
        height: usize,
    },
}

/// A generic 2D grid structure anchored at `(0, 0)`.
///
/// Stores elements of type `T` in a flat vector using row-major order.
/// Lookups take a [`Coordinate`]; anything outside `0..width` × `0..height`
/// (negative coordinates included) is simply absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a new grid with every cell set to `value`.
    ///
    /// # Panics
    ///
    /// Panics if `width * height` overflows `usize`.
    pub fn filled(width: usize, height: usize, value: T) -> Self
    where
        T: Clone,
    {
        let size = width.checked_mul(height).expect("Grid size overflow");
        Grid {
            width,
            height,
            cells: vec![value; size],
        }
    }

    /// Creates a new grid with the specified dimensions, filled by a generator function.
    ///
    /// The generator function `f` receives each cell's coordinate in row-major order.
    ///
    /// # Arguments
    ///
    /// * `width`: The width of the grid.
    /// * `height`: The height of the grid.
    /// * `f`: A function `FnMut(Coordinate) -> T` to generate cell values.
    ///
    /// # Panics
    ///
    /// Panics if `width * height` overflows `usize`.
    pub fn from_generator<F>(width: usize, height: usize, mut f: F) -> Self
    where
        F: FnMut(Coordinate) -> T,
    {
        let size = width.checked_mul(height).expect("Grid size overflow");
        let mut cells = Vec::with_capacity(size);
        for y in 0..height {
            for x in 0..width {
                cells.push(f(Coordinate::new(x as i32, y as i32)));
            }
        }
        Grid {
            width,
            height,
            cells,
        }
    }

    /// Returns the width of the grid.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the height of the grid.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Converts a coordinate to a flat vector index.
    ///
    /// Returns `None` if the coordinate is out of bounds.
    #[inline]
    pub fn index_of(&self, coordinate: Coordinate) -> Option<usize> {
        let x = usize::try_from(coordinate.x).ok()?;
        let y = usize::try_from(coordinate.y).ok()?;
        if x < self.width && y < self.height {
            Some(y * self.width + x)
        } else {
            None
        }
    }

    /// Converts a flat vector index back to a coordinate.
    #[inline]
    fn coordinate_of(&self, index: usize) -> Coordinate {
        Coordinate::new((index % self.width) as i32, (index / self.width) as i32)
    }

    /// Checks if the given coordinate is within the grid boundaries.
    #[inline]
    pub fn contains(&self, coordinate: Coordinate) -> bool {
        self.index_of(coordinate).is_some()
    }

    /// Gets an immutable reference to the cell at the given coordinate.
    pub fn get(&self, coordinate: Coordinate) -> Option<&T> {
        self.index_of(coordinate).map(|index| &self.cells[index])
    }

    /// Gets a mutable reference to the cell at the given coordinate.
    pub fn get_mut(&mut self, coordinate: Coordinate) -> Option<&mut T> {
        self.index_of(coordinate).map(|index| &mut self.cells[index])
    }

    /// Sets the value of the cell at the given coordinate.
    ///
    /// Returns `Err(GridError::OutOfBounds)` if the coordinate is invalid.
    pub fn set(&mut self, coordinate: Coordinate, value: T) -> Result<(), GridError> {
        let index = self.index_of(coordinate).ok_or(GridError::OutOfBounds {
            coordinate,
            width: self.width,
            height: self.height,
        })?;
        self.cells[index] = value;
        Ok(())
    }

    /// Returns an iterator over every coordinate of the grid in row-major order.
    pub fn coordinates(&self) -> impl Iterator<Item = Coordinate> + '_ {
        (0..self.cells.len()).map(move |index| self.coordinate_of(index))
    }

    /// Returns an iterator that yields `(Coordinate, &T)` for each cell.
    pub fn enumerate(&self) -> impl Iterator<Item = (Coordinate, &T)> {
        self.cells
            .iter()
            .enumerate()
            .map(move |(index, cell)| (self.coordinate_of(index), cell))
    }

    /// Returns an iterator over the cells of the grid in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.cells.iter()
    }
}

impl<T> Index<Coordinate> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, coordinate: Coordinate) -> &Self::Output {
        match self.index_of(coordinate) {
            Some(idx) => &self.cells[idx],
            None => panic!(
                "Grid index {} out of bounds for grid size ({}, {})",
                coordinate, self.width, self.height
            ),
        }
    }
}

impl<T> IndexMut<Coordinate> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, coordinate: Coordinate) -> &mut Self::Output {
        let width = self.width;
        let height = self.height;
        match self.index_of(coordinate) {
            Some(idx) => &mut self.cells[idx],
            None => panic!(
                "Grid index {} out of bounds for grid size ({}, {})",
                coordinate, width, height
            ),
        }
    }
}
