mod locate;
mod overlay;
mod proj;
mod repair;
